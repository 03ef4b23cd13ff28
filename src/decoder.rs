//! Per-log transforms applied before delivery.

use alloy::{
    dyn_abi::{DecodedEvent, DynSolValue, EventExt},
    json_abi::Event,
    rpc::types::Log,
};

use crate::MatchCriteria;

/// Transforms a matched log into the value handed to `on_logs`.
///
/// Returning `None` drops the log; it is neither delivered nor reported as an error.
pub trait EventDecoder: Send + Sync + 'static {
    type Output: Send + 'static;

    fn decode(&self, log: Log, criteria: &MatchCriteria) -> Option<Self::Output>;
}

/// Delivers logs exactly as the node returned them.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawLogDecoder;

impl EventDecoder for RawLogDecoder {
    type Output = Log;

    fn decode(&self, log: Log, _criteria: &MatchCriteria) -> Option<Log> {
        Some(log)
    }
}

/// Decodes logs against the watched events' ABI.
///
/// Logs that fail the criteria client-side (a node may ignore topic filters) are dropped. Logs
/// whose topics or data do not decode are delivered with `args: None`, unless `strict` is set,
/// in which case they are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbiDecoder {
    strict: bool,
}

impl AbiDecoder {
    #[must_use]
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl EventDecoder for AbiDecoder {
    type Output = DecodedLog;

    fn decode(&self, log: Log, criteria: &MatchCriteria) -> Option<DecodedLog> {
        if !criteria.matches(&log) {
            trace!(
                address = %log.address(),
                block_number = ?log.block_number,
                "Dropping log outside match criteria"
            );
            return None;
        }

        if criteria.events().is_empty() {
            return Some(DecodedLog { log, event_name: None, args: None });
        }

        match resolve(&log, criteria) {
            Some((event, Ok(decoded))) => {
                let args = EventArgs::from_decoded(event, decoded);
                Some(DecodedLog { event_name: Some(event.name.clone()), args, log })
            }
            Some((event, Err(err))) if !self.strict => {
                debug!(event = %event.name, error = %err, "Delivering log without arguments");
                Some(DecodedLog { event_name: Some(event.name.clone()), args: None, log })
            }
            None if !self.strict => Some(DecodedLog { log, event_name: None, args: None }),
            _ => {
                debug!(
                    address = %log.address(),
                    block_number = ?log.block_number,
                    "Dropping undecodable log in strict mode"
                );
                None
            }
        }
    }
}

/// Find the event a log belongs to and decode it.
///
/// Anonymous events carry no selector, so they are tried in declaration order until one decodes.
fn resolve<'a>(
    log: &Log,
    criteria: &'a MatchCriteria,
) -> Option<(&'a Event, Result<DecodedEvent, alloy::dyn_abi::Error>)> {
    if let Some(event) = criteria.event_for(log) {
        return Some((event, event.decode_log(log.data())));
    }

    criteria
        .events()
        .iter()
        .filter(|event| event.anonymous)
        .find_map(|event| event.decode_log(log.data()).ok().map(|decoded| (event, Ok(decoded))))
}

/// A log together with its ABI-decoded arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedLog {
    pub log: Log,
    /// Name of the event the log was matched against, if known.
    pub event_name: Option<String>,
    /// Decoded arguments, or `None` if the log could not be decoded.
    pub args: Option<EventArgs>,
}

/// Decoded event arguments, in declaration order.
///
/// Events whose inputs are all named decode to [`EventArgs::Named`]; any unnamed input makes the
/// whole set positional.
#[derive(Clone, Debug, PartialEq)]
pub enum EventArgs {
    Named(Vec<(String, DynSolValue)>),
    Positional(Vec<DynSolValue>),
}

impl EventArgs {
    fn from_decoded(event: &Event, decoded: DecodedEvent) -> Option<Self> {
        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();

        let values = event
            .inputs
            .iter()
            .map(|input| if input.indexed { indexed.next() } else { body.next() })
            .collect::<Option<Vec<_>>>()?;

        if event.inputs.iter().all(|input| !input.name.is_empty()) {
            let names = event.inputs.iter().map(|input| input.name.clone());
            Some(EventArgs::Named(names.zip(values).collect()))
        } else {
            Some(EventArgs::Positional(values))
        }
    }

    /// Look up an argument by name. Always `None` for positional arguments.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        match self {
            EventArgs::Named(args) => args.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            EventArgs::Positional(_) => None,
        }
    }

    /// Argument values in declaration order.
    #[must_use]
    pub fn values(&self) -> Vec<&DynSolValue> {
        match self {
            EventArgs::Named(args) => args.iter().map(|(_, v)| v).collect(),
            EventArgs::Positional(values) => values.iter().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            EventArgs::Named(args) => args.len(),
            EventArgs::Positional(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
