// src/core/processor/echo.rs

use super::{AsyncProcessor, CompletionCallback};
use crate::core::errors::SpinelRpcError;
use crate::core::protocol::Protocol;
use std::sync::Arc;
use tracing::debug;

/// A processor that writes every complete inbound message straight back.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProcessor;

impl AsyncProcessor for EchoProcessor {
    fn process(
        &self,
        cob: CompletionCallback,
        input: Arc<dyn Protocol>,
        output: Arc<dyn Protocol>,
    ) -> Result<(), SpinelRpcError> {
        let mut echoed = 0usize;
        while let Some(message) = input.read_message()? {
            echoed += 1;
            output.write_message(message)?;
        }
        debug!("Echoed {} message(s).", echoed);
        cob.call(true);
        Ok(())
    }
}
