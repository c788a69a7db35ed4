//! `Crypto` and `SubtleCrypto`. Only `randomUUID` does real work; every
//! SubtleCrypto operation rejects.

use crate::catalogue::HostClassDescriptor;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::{AsyncOutcome, HostCall, HostValue, InstanceState};

/// Required argument count of each SubtleCrypto operation.
const SUBTLE_OPERATIONS: &[(&str, usize)] = &[
    ("encrypt", 3),
    ("decrypt", 3),
    ("sign", 3),
    ("verify", 4),
    ("digest", 2),
    ("generateKey", 3),
    ("deriveKey", 5),
    ("deriveBits", 3),
    ("importKey", 5),
    ("exportKey", 2),
    ("wrapKey", 4),
    ("unwrapKey", 7),
];

pub(super) fn crypto(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.singleton("Crypto", || InstanceState::Crypto).into())
}

fn subtle(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call
        .host
        .singleton("SubtleCrypto", || InstanceState::SubtleCrypto)
        .into())
}

fn random_uuid(_call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(uuid::Uuid::new_v4().to_string().into())
}

fn unsupported_operation(call: &mut HostCall<'_>) -> AsyncOutcome {
    let receiver = call
        .host
        .instance(call.this)
        .map(|instance| matches!(instance.state, InstanceState::SubtleCrypto));
    match receiver {
        Ok(true) => {}
        Ok(false) => {
            return AsyncOutcome::Settled(Err(HostError::type_mismatch("Illegal invocation")))
        }
        Err(err) => return AsyncOutcome::Settled(Err(err)),
    }
    let required = SUBTLE_OPERATIONS
        .iter()
        .find(|(name, _)| *name == call.member)
        .map(|(_, required)| *required)
        .unwrap_or(0);
    if let Err(err) = call.require_args(required) {
        return AsyncOutcome::Settled(Err(err));
    }
    tracing::debug!(target: "hostbridge::host", operation = call.member, "SubtleCrypto operation rejected");
    AsyncOutcome::Settled(Err(HostError::not_supported("Operation is not supported")))
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    let mut subtle_crypto = HostClassDescriptor::new("SubtleCrypto")
        .illegal_constructor(ChromeAndEdgeAndFirefox);
    for (name, required) in SUBTLE_OPERATIONS {
        subtle_crypto = subtle_crypto.async_function(*name, *required as u8, unsupported_operation);
    }

    vec![
        HostClassDescriptor::new("Crypto")
            .visible_in(ChromeAndEdgeAndFirefox)
            .illegal_constructor(ChromeAndEdgeAndFirefox)
            .read_only("subtle", subtle)
            .function("randomUUID", 0, random_uuid)
            .only(ChromeAndEdge)
            .function("randomUUID", 0, random_uuid)
            .only(FFLatest),
        subtle_crypto,
    ]
}

#[cfg(test)]
mod tests {
    use super::super::testing::window;
    use super::*;
    use crate::profile::BrowserProfile;

    #[test]
    fn missing_arguments_reject_with_a_type_error() {
        let mut host = window("", BrowserProfile::chrome());
        let subtle = host.singleton("SubtleCrypto", || InstanceState::SubtleCrypto);
        let mut call = HostCall::new(&mut host, subtle, "SubtleCrypto", "generateKey", vec![HostValue::Null]);
        match unsupported_operation(&mut call) {
            AsyncOutcome::Settled(Err(HostError::TypeMismatch(message))) => {
                assert!(message.contains("3 arguments required, but only 1 present"), "{message}")
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn complete_calls_reject_as_not_supported() {
        let mut host = window("", BrowserProfile::firefox());
        let subtle = host.singleton("SubtleCrypto", || InstanceState::SubtleCrypto);
        let args = vec![HostValue::from("SHA-256"), HostValue::Null];
        let mut call = HostCall::new(&mut host, subtle, "SubtleCrypto", "digest", args);
        assert_eq!(
            unsupported_operation(&mut call),
            AsyncOutcome::Settled(Err(HostError::not_supported("Operation is not supported")))
        );
    }
}
