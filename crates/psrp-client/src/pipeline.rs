//! Pipeline state machine (§4.D): pending → running → completed | failed |
//! stopped | stopping, driven entirely off the dispatcher thread. Output is
//! served through seven bounded channels, one per PSRP stream, mirroring the
//! teacher's per-pipeline bookkeeping in `ironposh-client-core::pipeline`
//! generalized from its async `PipelineHandle`/state fields to blocking
//! `crossbeam_channel` receivers a caller can drain from any thread.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use psrp_protocol::{
    Command, CommandParameter, CreatePipelineMessage, ErrorRecord, InformationRecord,
    PSInvocationState, PowerShellPipeline, ProgressRecord,
};
use uuid::Uuid;

use crate::error::ClientError;

/// One command plus its positional/named parameters, mirroring the
/// teacher's `PipelineCommand` at the business-object level (before it is
/// lowered into the wire `Command`/`CommandParameter` shapes).
#[derive(Debug, Clone)]
pub struct PipelineCommand {
    pub name: String,
    pub is_script: bool,
    pub use_local_scope: Option<bool>,
    pub parameters: Vec<(Option<String>, psrp_protocol::PsValue)>,
}

impl PipelineCommand {
    pub fn script(script: impl Into<String>) -> Self {
        Self {
            name: script.into(),
            is_script: true,
            use_local_scope: None,
            parameters: Vec::new(),
        }
    }

    pub fn cmdlet(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_script: false,
            use_local_scope: None,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: psrp_protocol::PsValue) -> Self {
        self.parameters.push((Some(name.into()), value));
        self
    }

    pub fn with_argument(mut self, value: psrp_protocol::PsValue) -> Self {
        self.parameters.push((None, value));
        self
    }

    fn to_wire_command(&self) -> Command {
        let args = self
            .parameters
            .iter()
            .map(|(name, value)| match name {
                Some(name) => CommandParameter::named(name.clone(), value.clone()),
                None => CommandParameter::positional(value.clone()),
            })
            .collect();

        Command::builder()
            .cmd(self.name.clone())
            .is_script(self.is_script)
            .use_local_scope(self.use_local_scope)
            .args(args)
            .build()
    }
}

/// A not-yet-invoked pipeline specification: one or more commands chained
/// together, built up before the pipeline is handed to a pool.
#[derive(Debug, Clone, Default)]
pub struct PipelineSpec {
    pub commands: Vec<PipelineCommand>,
    pub no_input: bool,
}

impl PipelineSpec {
    pub fn script(script: impl Into<String>) -> Self {
        Self {
            commands: vec![PipelineCommand::script(script)],
            no_input: true,
        }
    }

    /// A pipeline whose input stream stays open after invocation, fed later
    /// with [`crate::pool::RunspacePool::write_pipeline_input`] and closed
    /// with `close_input` (§4.D "streaming input").
    pub fn streaming(script: impl Into<String>) -> Self {
        Self {
            commands: vec![PipelineCommand::script(script)],
            no_input: false,
        }
    }

    pub(crate) fn to_protocol_pipeline(&self) -> PowerShellPipeline {
        PowerShellPipeline::builder()
            .cmds(self.commands.iter().map(PipelineCommand::to_wire_command).collect::<Vec<_>>())
            .build()
    }
}

const CHANNEL_CAPACITY: usize = 256;

fn bounded_pair<T>() -> (Sender<T>, Receiver<T>) {
    crossbeam_channel::bounded(CHANNEL_CAPACITY)
}

/// The seven PSRP streams a pipeline can produce output on (§1 OVERVIEW).
pub struct PipelineChannels {
    pub output: Receiver<psrp_protocol::PipelineOutput>,
    pub error: Receiver<ErrorRecord>,
    pub warning: Receiver<psrp_protocol::PsValue>,
    pub verbose: Receiver<psrp_protocol::PsValue>,
    pub debug: Receiver<psrp_protocol::PsValue>,
    pub progress: Receiver<ProgressRecord>,
    pub information: Receiver<InformationRecord>,
}

pub(crate) struct PipelineSenders {
    pub output: Sender<psrp_protocol::PipelineOutput>,
    pub error: Sender<ErrorRecord>,
    pub warning: Sender<psrp_protocol::PsValue>,
    pub verbose: Sender<psrp_protocol::PsValue>,
    pub debug: Sender<psrp_protocol::PsValue>,
    pub progress: Sender<ProgressRecord>,
    pub information: Sender<InformationRecord>,
}

pub(crate) fn new_stream_channels() -> (PipelineSenders, PipelineChannels) {
    let (output_tx, output_rx) = bounded_pair();
    let (error_tx, error_rx) = bounded_pair();
    let (warning_tx, warning_rx) = bounded_pair();
    let (verbose_tx, verbose_rx) = bounded_pair();
    let (debug_tx, debug_rx) = bounded_pair();
    let (progress_tx, progress_rx) = bounded_pair();
    let (information_tx, information_rx) = bounded_pair();

    (
        PipelineSenders {
            output: output_tx,
            error: error_tx,
            warning: warning_tx,
            verbose: verbose_tx,
            debug: debug_tx,
            progress: progress_tx,
            information: information_tx,
        },
        PipelineChannels {
            output: output_rx,
            error: error_rx,
            warning: warning_rx,
            verbose: verbose_rx,
            debug: debug_rx,
            progress: progress_rx,
            information: information_rx,
        },
    )
}

/// A running (or finished) pipeline, owned by the pool that created it. The
/// pool's dispatcher is the only writer to `state` and `senders`; callers
/// only read state and drain channels.
pub struct Pipeline {
    pub id: Uuid,
    pub(crate) spec: PipelineSpec,
    pub(crate) state: PSInvocationState,
    /// `None` once the pipeline reaches a terminal state, at which point
    /// every stream channel is closed (§4.D "Terminal transitions").
    pub(crate) senders: Option<PipelineSenders>,
    channels: Option<PipelineChannels>,
    completion: Receiver<Result<(), ClientError>>,
    pub(crate) completion_tx: Sender<Result<(), ClientError>>,
}

impl Pipeline {
    pub(crate) fn new(id: Uuid, spec: PipelineSpec) -> Self {
        let (senders, channels) = new_stream_channels();
        let (completion_tx, completion) = crossbeam_channel::bounded(1);
        Self {
            id,
            spec,
            state: PSInvocationState::NotStarted,
            senders: Some(senders),
            channels: Some(channels),
            completion,
            completion_tx,
        }
    }

    /// Transitions to a terminal state, closing every stream channel and
    /// releasing any `wait()` caller.
    pub(crate) fn finish(&mut self, state: PSInvocationState, result: Result<(), ClientError>) {
        self.state = state;
        self.senders = None;
        let _ = self.completion_tx.send(result);
    }

    /// Takes the stream channels; callers may only do this once per pipeline.
    pub fn take_channels(&mut self) -> Option<PipelineChannels> {
        self.channels.take()
    }

    pub(crate) fn to_create_pipeline_message(
        &self,
        host_info: psrp_protocol::HostInfo,
    ) -> CreatePipelineMessage {
        CreatePipelineMessage::builder()
            .no_input(self.spec.no_input)
            .pipeline(self.spec.to_protocol_pipeline())
            .host_info(host_info)
            .build()
    }

    pub fn state(&self) -> &PSInvocationState {
        &self.state
    }

    /// A cloned handle onto the completion channel, so a caller can wait
    /// without holding whatever lock guards the pool that owns this
    /// pipeline (crossbeam channels are multi-consumer; only the first
    /// receiver to poll after completion gets the message).
    pub(crate) fn completion_receiver(&self) -> Receiver<Result<(), ClientError>> {
        self.completion.clone()
    }

    /// Blocks until the pipeline reaches a terminal state or `timeout`
    /// elapses (§4.D "wait").
    pub fn wait(&self, timeout: Duration) -> Result<(), ClientError> {
        match self.completion.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                Err(ClientError::AcquireTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(ClientError::PipelineFailed("pipeline dropped before completion".to_string()))
            }
        }
    }
}
