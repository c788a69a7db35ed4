//! Web Audio surface: contexts, nodes and buffers. No audio is produced.

use crate::catalogue::HostClassDescriptor;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::{
    AsyncOutcome, DeferredAction, HostCall, HostValue, InstanceId, InstanceState, WindowHost,
};

const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioContextState {
    pub sample_rate: f64,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioNodeState {
    pub context: InstanceId,
    pub outputs: Vec<InstanceId>,
    /// `AudioBufferSourceNode.buffer`.
    pub buffer: Option<InstanceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioBufferState {
    pub length: u32,
    pub sample_rate: f64,
    pub channels: u32,
}

impl AudioBufferState {
    pub fn duration(&self) -> f64 {
        f64::from(self.length) / self.sample_rate
    }
}

impl WindowHost {
    fn audio_context(&self, id: InstanceId) -> HostResult<&AudioContextState> {
        match &self.instance(id)?.state {
            InstanceState::AudioContext(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    fn audio_node_mut(&mut self, id: InstanceId) -> HostResult<&mut AudioNodeState> {
        match &mut self.instance_mut(id)?.state {
            InstanceState::AudioNode(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    fn audio_buffer(&self, id: InstanceId) -> HostResult<&AudioBufferState> {
        match &self.instance(id)?.state {
            InstanceState::AudioBuffer(state) => Ok(state),
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        }
    }

    fn create_audio_node(&mut self, class: &'static str, context: InstanceId) -> InstanceId {
        self.create_instance(
            class,
            InstanceState::AudioNode(AudioNodeState {
                context,
                outputs: Vec::new(),
                buffer: None,
            }),
        )
    }
}

fn construct_audio_context(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let sample_rate = call
        .arg(0)
        .get("sampleRate")
        .map(HostValue::to_number)
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .unwrap_or(DEFAULT_SAMPLE_RATE);
    let context = call.host.create_instance(
        "AudioContext",
        InstanceState::AudioContext(AudioContextState {
            sample_rate,
            closed: false,
        }),
    );
    Ok(context.into())
}

/// Constructors of `AudioNode` and its subclasses take the owning context first.
fn construct_audio_node(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let context = call.object_arg(0).filter(|context| {
        call.host
            .class_of(*context)
            .map(|class| call.host.catalogue().is_a(class, "BaseAudioContext"))
            .unwrap_or(false)
    });
    let Some(context) = context else {
        return Err(HostError::type_mismatch(format!(
            "Failed to construct '{}': first parameter is not of type 'BaseAudioContext'.",
            call.class
        )));
    };
    Ok(call.host.create_audio_node(call.class, context).into())
}

fn sample_rate(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.audio_context(call.this)?.sample_rate.into())
}

fn current_time(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.host.audio_context(call.this)?;
    Ok(0.0.into())
}

fn context_state(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let closed = call.host.audio_context(call.this)?.closed;
    Ok(if closed { "closed" } else { "running" }.into())
}

fn create_buffer_source(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.host.audio_context(call.this)?;
    Ok(call
        .host
        .create_audio_node("AudioBufferSourceNode", call.this)
        .into())
}

fn create_gain(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.host.audio_context(call.this)?;
    Ok(call.host.create_audio_node("GainNode", call.this).into())
}

fn new_buffer(
    call: &mut HostCall<'_>,
    channels: f64,
    length: f64,
    sample_rate: f64,
) -> HostResult<HostValue> {
    if !(channels >= 1.0 && length >= 1.0 && sample_rate > 0.0) {
        return Err(HostError::not_supported(format!(
            "Failed to execute '{}' on '{}': The number of frames provided ({length}) is less than or equal to the minimum bound (0).",
            call.member, call.class
        )));
    }
    let buffer = call.host.create_instance(
        "AudioBuffer",
        InstanceState::AudioBuffer(AudioBufferState {
            length: length as u32,
            sample_rate,
            channels: channels as u32,
        }),
    );
    Ok(buffer.into())
}

fn create_buffer(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(3)?;
    call.host.audio_context(call.this)?;
    let (channels, length, rate) = (call.number_arg(0), call.number_arg(1), call.number_arg(2));
    new_buffer(call, channels, length, rate)
}

fn construct_audio_buffer(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let options = call.arg(0).clone();
    let Some(length) = options.get("length").map(HostValue::to_number) else {
        return Err(HostError::type_mismatch(
            "Failed to construct 'AudioBuffer': Failed to read the 'length' property from 'AudioBufferOptions': Required member is undefined.",
        ));
    };
    let channels = options
        .get("numberOfChannels")
        .map(HostValue::to_number)
        .unwrap_or(1.0);
    let rate = options
        .get("sampleRate")
        .map(HostValue::to_number)
        .unwrap_or(DEFAULT_SAMPLE_RATE);
    new_buffer(call, channels, length, rate)
}

/// With an error callback the failure is delivered through it, called on the
/// context with no arguments; otherwise through the returned promise.
fn decode_audio_data(call: &mut HostCall<'_>) -> AsyncOutcome {
    if let Err(err) = call.require_args(1) {
        return AsyncOutcome::Settled(Err(err));
    }
    if let Err(err) = call.host.audio_context(call.this) {
        return AsyncOutcome::Settled(Err(err));
    }
    match call.callback_arg(2) {
        Some(callback) => {
            call.host.deferred_mut().push(DeferredAction::InvokeCallback {
                callback,
                this: Some(call.this),
                args: Vec::new(),
            });
            AsyncOutcome::Scheduled
        }
        None => AsyncOutcome::Settled(Err(HostError::not_supported(
            "decodeAudioData is not supported",
        ))),
    }
}

fn close(call: &mut HostCall<'_>) -> AsyncOutcome {
    let result = match call.host.instance_mut(call.this) {
        Ok(instance) => match &mut instance.state {
            InstanceState::AudioContext(state) => {
                state.closed = true;
                Ok(HostValue::Undefined)
            }
            _ => Err(HostError::type_mismatch("Illegal invocation")),
        },
        Err(err) => Err(err),
    };
    AsyncOutcome::Settled(result)
}

fn node_context(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.audio_node_mut(call.this)?.context.into())
}

fn connect(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let destination = call.object_arg(0).filter(|target| {
        matches!(
            call.host.instance(*target).map(|instance| &instance.state),
            Ok(InstanceState::AudioNode(_))
        )
    });
    let Some(destination) = destination else {
        return Err(HostError::type_mismatch(
            "Failed to execute 'connect' on 'AudioNode': parameter 1 is not of type 'AudioNode'.",
        ));
    };
    call.host.audio_node_mut(call.this)?.outputs.push(destination);
    Ok(destination.into())
}

fn disconnect(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.host.audio_node_mut(call.this)?.outputs.clear();
    Ok(HostValue::Undefined)
}

fn source_buffer(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.audio_node_mut(call.this)?.buffer.into())
}

fn set_source_buffer(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let buffer = match call.arg(0) {
        HostValue::Null | HostValue::Undefined => None,
        value => {
            let id = value.as_object().ok_or_else(|| {
                HostError::type_mismatch(
                    "Failed to set the 'buffer' property on 'AudioBufferSourceNode': The provided value is not of type 'AudioBuffer'.",
                )
            })?;
            call.host.audio_buffer(id)?;
            Some(id)
        }
    };
    call.host.audio_node_mut(call.this)?.buffer = buffer;
    Ok(HostValue::Undefined)
}

fn buffer_length(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.audio_buffer(call.this)?.length.into())
}

fn buffer_sample_rate(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.audio_buffer(call.this)?.sample_rate.into())
}

fn buffer_channels(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.audio_buffer(call.this)?.channels.into())
}

fn buffer_duration(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.audio_buffer(call.this)?.duration().into())
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::ChromeAndEdgeAndFirefox as Modern;

    vec![
        HostClassDescriptor::new("BaseAudioContext")
            .extends("EventTarget")
            .visible_in(Modern)
            .illegal_constructor(Modern)
            .read_only("sampleRate", sample_rate)
            .read_only("currentTime", current_time)
            .read_only("state", context_state)
            .function("createBufferSource", 0, create_buffer_source)
            .function("createGain", 0, create_gain)
            .function("createBuffer", 3, create_buffer)
            .async_function("decodeAudioData", 1, decode_audio_data),
        HostClassDescriptor::new("AudioContext")
            .extends("BaseAudioContext")
            .visible_in(Modern)
            .constructor(construct_audio_context, Modern)
            .async_function("close", 0, close),
        HostClassDescriptor::new("AudioNode")
            .extends("EventTarget")
            .visible_in(Modern)
            .constructor_with(&["context"], construct_audio_node, Modern)
            .read_only("context", node_context)
            .function("connect", 1, connect)
            .function("disconnect", 0, disconnect),
        HostClassDescriptor::new("GainNode")
            .extends("AudioNode")
            .visible_in(Modern)
            .constructor_with(&["context", "options"], construct_audio_node, Modern),
        HostClassDescriptor::new("AudioBufferSourceNode")
            .extends("AudioNode")
            .visible_in(Modern)
            .constructor_with(&["context", "options"], construct_audio_node, Modern)
            .property("buffer", source_buffer, Some(set_source_buffer)),
        HostClassDescriptor::new("AudioBuffer")
            .visible_in(Modern)
            .constructor_with(&["options"], construct_audio_buffer, Modern)
            .read_only("length", buffer_length)
            .read_only("sampleRate", buffer_sample_rate)
            .read_only("numberOfChannels", buffer_channels)
            .read_only("duration", buffer_duration),
    ]
}
