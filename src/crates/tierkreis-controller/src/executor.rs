//! The collaborator trait a `Func` node's dispatch hands its call off to, and
//! an in-memory reference implementation used by tests and `examples/`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use async_trait::async_trait;
use tierkreis_core::PortID;
use tierkreis_storage::WorkerCallArgs;

/// An error raised by a registered function or an RPC-backed executor.
#[derive(Debug, Clone)]
pub struct ExecutorError(pub String);

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ExecutorError {}

/// Invokes the function named by a [`WorkerCallArgs`] with its resolved
/// input bytes, returning its output bytes by port.
///
/// A real deployment implements this over a subprocess launcher or an RPC
/// channel to an out-of-process worker; the core ships only the in-memory
/// reference implementation ([`InMemoryExecutor`]), which is not a
/// production executor — it has no sandboxing and no resource limits.
///
/// `launcher` is the prefix a `Func` node's dotted name split off (empty for
/// an unqualified name) — which concrete subprocess or RPC endpoint should
/// field the call, as distinct from `call.function_name`, which names the
/// function itself.
#[async_trait]
pub trait ControllerExecutor: Send + Sync {
    async fn call(
        &self,
        launcher: &str,
        call: &WorkerCallArgs,
        inputs: &BTreeMap<PortID, Vec<u8>>,
    ) -> Result<BTreeMap<PortID, Vec<u8>>, ExecutorError>;
}

type Func = dyn Fn(&BTreeMap<PortID, Vec<u8>>) -> Result<BTreeMap<PortID, Vec<u8>>, String>
    + Send
    + Sync;

struct Registered {
    expected_inputs: BTreeSet<PortID>,
    func: Box<Func>,
}

/// A registry-of-closures [`ControllerExecutor`], for tests and examples.
///
/// Each registered function declares the exact set of input port names it
/// expects; a call whose resolved inputs don't match that set exactly is
/// rejected before the closure ever runs (the call-args boundary check,
/// standing in for the original's type-hint validation).
#[derive(Default)]
pub struct InMemoryExecutor {
    functions: BTreeMap<String, Registered>,
}

impl InMemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under `name`, declaring the exact input ports it
    /// expects to receive.
    pub fn register<I, S>(
        &mut self,
        name: impl Into<String>,
        expected_inputs: I,
        func: impl Fn(&BTreeMap<PortID, Vec<u8>>) -> Result<BTreeMap<PortID, Vec<u8>>, String>
            + Send
            + Sync
            + 'static,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PortID>,
    {
        self.functions.insert(
            name.into(),
            Registered {
                expected_inputs: expected_inputs.into_iter().map(Into::into).collect(),
                func: Box::new(func),
            },
        );
        self
    }
}

#[async_trait]
impl ControllerExecutor for InMemoryExecutor {
    async fn call(
        &self,
        _launcher: &str,
        call: &WorkerCallArgs,
        inputs: &BTreeMap<PortID, Vec<u8>>,
    ) -> Result<BTreeMap<PortID, Vec<u8>>, ExecutorError> {
        let registered = self.functions.get(&call.function_name).ok_or_else(|| {
            ExecutorError(format!("no function registered as `{}`", call.function_name))
        })?;
        let provided: BTreeSet<PortID> = inputs.keys().cloned().collect();
        if provided != registered.expected_inputs {
            return Err(ExecutorError(format!(
                "function `{}` expects inputs {:?}, got {:?}",
                call.function_name, registered.expected_inputs, provided
            )));
        }
        (registered.func)(inputs).map_err(ExecutorError)
    }
}
