use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

use crate::rpc_msg::{RpcAnswer, RpcError};

/// A callable registered on the server under a name
pub trait Procedure: Send + Sync {
    fn call(&self, params: &[u8]) -> RpcAnswer;
}

/// Procedure with a declared request type, the params must deserialize into `Req` before the handler runs
pub struct TypedProcedure<Req, Res, F> {
    _tmp: PhantomData<fn(Req) -> Res>,
    handler: F,
}

pub fn typed<Req, Res, F>(handler: F) -> TypedProcedure<Req, Res, F>
where
    Req: DeserializeOwned,
    Res: Serialize,
    F: Fn(Req) -> Result<Res, String> + Send + Sync,
{
    TypedProcedure { _tmp: Default::default(), handler }
}

impl<Req, Res, F> Procedure for TypedProcedure<Req, Res, F>
where
    Req: DeserializeOwned,
    Res: Serialize,
    F: Fn(Req) -> Result<Res, String> + Send + Sync,
{
    fn call(&self, params: &[u8]) -> RpcAnswer {
        let req: Req = bincode::deserialize(params).map_err(|e| RpcError::InvalidParams(e.to_string()))?;
        let res = (self.handler)(req).map_err(RpcError::RuntimeError)?;
        bincode::serialize(&res).map_err(|e| RpcError::EncodeError(e.to_string()))
    }
}

/// Raw bytes in, raw bytes out
pub struct RawProcedure<F>(pub F);

impl<F> Procedure for RawProcedure<F>
where
    F: Fn(&[u8]) -> RpcAnswer + Send + Sync,
{
    fn call(&self, params: &[u8]) -> RpcAnswer {
        (self.0)(params)
    }
}

#[derive(Default)]
pub struct ProcedureRegistry {
    procedures: RwLock<HashMap<String, Arc<dyn Procedure>>>,
}

impl ProcedureRegistry {
    /// Returns true if a procedure with the same name was replaced
    pub fn register<P: Procedure + 'static>(&self, name: &str, procedure: P) -> bool {
        log::info!("[ProcedureRegistry] register {}", name);
        self.procedures.write().insert(name.to_string(), Arc::new(procedure)).is_some()
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.procedures.write().remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.procedures.read().contains_key(name)
    }

    /// The registry lock is released before the procedure runs
    pub fn execute(&self, name: &str, params: &[u8]) -> RpcAnswer {
        let procedure = self.procedures.read().get(name).cloned().ok_or_else(|| RpcError::ProcedureNotFound(name.to_string()))?;
        procedure.call(params)
    }
}
