//! Log match criteria shared by the filter and range paths.

use std::fmt;

use alloy::{
    dyn_abi::{DynSolValue, Specifier},
    json_abi::{Event, JsonAbi},
    primitives::{Address, B256, keccak256},
    rpc::types::{Filter, Log},
};

use crate::CriteriaError;

/// Identifies an event argument in a constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgKey {
    /// A named ABI input.
    Name(String),
    /// A position in the event's input list, counting indexed and non-indexed inputs. Used for
    /// events whose inputs are unnamed.
    Index(usize),
}

impl From<&str> for ArgKey {
    fn from(name: &str) -> Self {
        ArgKey::Name(name.to_owned())
    }
}

impl From<String> for ArgKey {
    fn from(name: String) -> Self {
        ArgKey::Name(name)
    }
}

impl From<usize> for ArgKey {
    fn from(index: usize) -> Self {
        ArgKey::Index(index)
    }
}

impl fmt::Display for ArgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKey::Name(name) => write!(f, "`{name}`"),
            ArgKey::Index(index) => write!(f, "#{index}"),
        }
    }
}

#[derive(Clone, Debug)]
struct ArgConstraint {
    key: ArgKey,
    accepted: Vec<DynSolValue>,
}

/// What a watcher is looking for: emitting addresses, event signatures and indexed-argument
/// values.
///
/// Criteria are validated once, when built, and never change afterwards. They are turned into a
/// single [`Filter`] that is used verbatim both for `eth_newFilter` and for `eth_getLogs`, so the
/// two paths cannot disagree about what matches.
///
/// # Example
///
/// ```
/// use alloy::{json_abi::Event, primitives::address};
/// use event_watcher::MatchCriteria;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transfer = Event::parse(
///     "event Transfer(address indexed from, address indexed to, uint256 value)",
/// )?;
/// let criteria = MatchCriteria::builder()
///     .address(address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"))
///     .event(transfer)
///     .arg("to", address!("0xd8dA6BF26964af9d7eed9e03e53415d37aa96045"))
///     .build()?;
/// assert_eq!(criteria.events().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MatchCriteria {
    addresses: Vec<Address>,
    events: Vec<Event>,
    selectors: Vec<B256>,
    topic_constraints: Vec<(usize, Vec<B256>)>,
    filter: Filter,
}

impl MatchCriteria {
    /// Start building criteria.
    #[must_use]
    pub fn builder() -> MatchCriteriaBuilder {
        MatchCriteriaBuilder::default()
    }

    /// Criteria matching every log on the chain.
    #[must_use]
    pub fn any() -> Self {
        MatchCriteria {
            addresses: vec![],
            events: vec![],
            selectors: vec![],
            topic_constraints: vec![],
            filter: Filter::new(),
        }
    }

    /// Emitting addresses; empty means any address.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Watched events; empty means any log.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The canonical filter, without a block range.
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Returns `true` if `log` satisfies the address, signature and argument constraints.
    #[must_use]
    pub fn matches(&self, log: &Log) -> bool {
        if !self.addresses.is_empty() && !self.addresses.contains(&log.address()) {
            return false;
        }

        let topics = log.topics();

        if !self.selectors.is_empty()
            && !topics.first().is_some_and(|topic0| self.selectors.contains(topic0))
        {
            return false;
        }

        self.topic_constraints.iter().all(|(position, accepted)| {
            topics.get(*position).is_some_and(|topic| accepted.contains(topic))
        })
    }

    /// The watched event whose selector is the first topic of `log`.
    ///
    /// Anonymous events have no selector and are never returned.
    #[must_use]
    pub fn event_for(&self, log: &Log) -> Option<&Event> {
        let topic0 = log.topics().first()?;
        self.events.iter().find(|event| !event.anonymous && event.selector() == *topic0)
    }
}

/// Conversion into validated [`MatchCriteria`].
///
/// Accepted by [`EventWatcher::watch`](crate::EventWatcher::watch) so criteria errors surface at
/// watch time, before anything is polled.
pub trait IntoMatchCriteria {
    /// Validate and convert.
    ///
    /// # Errors
    ///
    /// Returns a [`CriteriaError`] if the criteria can never be satisfied.
    fn into_match_criteria(self) -> Result<MatchCriteria, CriteriaError>;
}

impl IntoMatchCriteria for MatchCriteria {
    fn into_match_criteria(self) -> Result<MatchCriteria, CriteriaError> {
        Ok(self)
    }
}

impl IntoMatchCriteria for MatchCriteriaBuilder {
    fn into_match_criteria(self) -> Result<MatchCriteria, CriteriaError> {
        self.build()
    }
}

/// Builder for [`MatchCriteria`].
#[derive(Clone, Debug, Default)]
pub struct MatchCriteriaBuilder {
    addresses: Vec<Address>,
    events: Vec<Event>,
    constraints: Vec<ArgConstraint>,
    error: Option<CriteriaError>,
}

impl MatchCriteriaBuilder {
    /// Only match logs emitted by `address`. May be called repeatedly.
    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    /// Only match logs emitted by one of `addresses`.
    #[must_use]
    pub fn addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.addresses.extend(addresses);
        self
    }

    /// Match logs of `event`. May be called repeatedly.
    #[must_use]
    pub fn event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Match logs of any of `events`.
    #[must_use]
    pub fn events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }

    /// Match logs of the event described by a human-readable signature, such as
    /// `"event Transfer(address indexed from, address indexed to, uint256 value)"`.
    ///
    /// A malformed signature is reported by [`build`](Self::build).
    #[must_use]
    pub fn event_signature(mut self, signature: &str) -> Self {
        let signature = signature.trim();
        let parsed = if signature.starts_with("event ") {
            Event::parse(signature)
        } else {
            Event::parse(&format!("event {signature}"))
        };
        match parsed {
            Ok(event) => self.events.push(event),
            Err(err) => {
                self.error.get_or_insert(CriteriaError::InvalidParameterType {
                    event: signature.to_owned(),
                    reason: err.to_string(),
                });
            }
        }
        self
    }

    /// Match every event declared in `abi`, emitted by `address`.
    #[must_use]
    pub fn contract(self, abi: &JsonAbi, address: Address) -> Self {
        self.address(address).events(abi.events().cloned())
    }

    /// Match the event called `name` in `abi` (all overloads), emitted by `address`.
    ///
    /// An unknown name is reported by [`build`](Self::build).
    #[must_use]
    pub fn contract_event(mut self, abi: &JsonAbi, address: Address, name: &str) -> Self {
        match abi.event(name) {
            Some(events) => self.address(address).events(events.iter().cloned()),
            None => {
                self.error.get_or_insert(CriteriaError::UnknownEvent(name.to_owned()));
                self
            }
        }
    }

    /// Only match logs whose indexed argument `key` equals `value`.
    #[must_use]
    pub fn arg(self, key: impl Into<ArgKey>, value: impl Into<DynSolValue>) -> Self {
        self.arg_any_of(key, [value])
    }

    /// Only match logs whose indexed argument `key` equals one of `values`.
    #[must_use]
    pub fn arg_any_of<V: Into<DynSolValue>>(
        mut self,
        key: impl Into<ArgKey>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.constraints.push(ArgConstraint {
            key: key.into(),
            accepted: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Validate the criteria.
    ///
    /// # Errors
    ///
    /// Returns a [`CriteriaError`] if an event name or signature was invalid, or if an argument
    /// constraint cannot be expressed as a topic filter.
    pub fn build(self) -> Result<MatchCriteria, CriteriaError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let topic_constraints = if self.constraints.is_empty() {
            vec![]
        } else {
            let [event] = self.events.as_slice() else {
                return Err(CriteriaError::ConstraintsRequireSingleEvent(self.events.len()));
            };
            resolve_constraints(event, &self.constraints)?
        };

        let selectors = if !self.events.is_empty() && self.events.iter().all(|e| !e.anonymous) {
            self.events.iter().map(Event::selector).collect()
        } else {
            vec![]
        };

        let mut filter = Filter::new();
        if !self.addresses.is_empty() {
            filter = filter.address(self.addresses.clone());
        }
        if !selectors.is_empty() {
            filter = filter.event_signature(selectors.clone());
        }
        for (position, accepted) in &topic_constraints {
            filter.topics[*position] = accepted.clone().into();
        }

        Ok(MatchCriteria {
            addresses: self.addresses,
            events: self.events,
            selectors,
            topic_constraints,
            filter,
        })
    }
}

/// Topics a log can carry, the selector included.
const MAX_TOPICS: usize = 4;

fn resolve_constraints(
    event: &Event,
    constraints: &[ArgConstraint],
) -> Result<Vec<(usize, Vec<B256>)>, CriteriaError> {
    let first_topic = usize::from(!event.anonymous);
    let mut resolved: Vec<(usize, Vec<B256>)> = Vec::with_capacity(constraints.len());

    for constraint in constraints {
        let argument = constraint.key.to_string();
        let input_index = match &constraint.key {
            ArgKey::Name(name) => event.inputs.iter().position(|input| input.name == *name),
            ArgKey::Index(index) => (*index < event.inputs.len()).then_some(*index),
        }
        .ok_or_else(|| CriteriaError::UnknownArgument {
            event: event.name.clone(),
            argument: argument.clone(),
        })?;

        let param = &event.inputs[input_index];
        if !param.indexed {
            return Err(CriteriaError::ArgumentNotIndexed { event: event.name.clone(), argument });
        }
        if constraint.accepted.is_empty() {
            return Err(CriteriaError::EmptyConstraint { event: event.name.clone(), argument });
        }

        let ty = param.resolve().map_err(|err| CriteriaError::InvalidParameterType {
            event: event.name.clone(),
            reason: err.to_string(),
        })?;
        if constraint.accepted.iter().any(|value| !ty.matches(value)) {
            return Err(CriteriaError::TypeMismatch {
                event: event.name.clone(),
                argument,
                expected: param.ty.clone(),
            });
        }

        let position =
            first_topic + event.inputs[..input_index].iter().filter(|input| input.indexed).count();
        if position >= MAX_TOPICS {
            return Err(CriteriaError::TopicOutOfRange {
                event: event.name.clone(),
                argument,
                position,
            });
        }
        if resolved.iter().any(|(existing, _)| *existing == position) {
            return Err(CriteriaError::DuplicateConstraint { event: event.name.clone(), argument });
        }

        resolved.push((position, constraint.accepted.iter().map(encode_topic).collect()));
    }

    Ok(resolved)
}

/// Encode an indexed argument value the way the EVM stores it in a topic.
///
/// Value types occupy the word directly; dynamic types are stored as the hash of their encoding.
fn encode_topic(value: &DynSolValue) -> B256 {
    value.as_word().unwrap_or_else(|| keccak256(value.abi_encode_packed()))
}
