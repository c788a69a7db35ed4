//! Classes that only exist in Internet Explorer.

use crate::catalogue::HostClassDescriptor;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::{HostCall, HostValue, InstanceState, WindowHost, InstanceId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatesState {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

impl WindowHost {
    pub fn create_coordinates(&mut self, coordinates: CoordinatesState) -> InstanceId {
        self.create_instance("Coordinates", InstanceState::Coordinates(coordinates))
    }
}

fn coordinates(call: &HostCall<'_>) -> HostResult<CoordinatesState> {
    match &call.host.instance(call.this)?.state {
        InstanceState::Coordinates(state) => Ok(*state),
        _ => Err(HostError::type_mismatch("Illegal invocation")),
    }
}

fn latitude(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(coordinates(call)?.latitude.into())
}

fn longitude(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(coordinates(call)?.longitude.into())
}

fn accuracy(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(coordinates(call)?.accuracy.into())
}

/// `new Enumerator()` works; handing it a collection does not.
fn construct_enumerator(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    if !call.arg(0).is_undefined() {
        return Err(HostError::type_mismatch("object is not enumerable"));
    }
    Ok(call
        .host
        .create_instance("Enumerator", InstanceState::Enumerator)
        .into())
}

fn enumerator(call: &HostCall<'_>) -> HostResult<()> {
    match call.host.instance(call.this)?.state {
        InstanceState::Enumerator => Ok(()),
        _ => Err(HostError::type_mismatch("Illegal invocation")),
    }
}

fn at_end(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    enumerator(call)?;
    Ok(true.into())
}

fn item(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    enumerator(call)?;
    Ok(HostValue::Undefined)
}

fn move_cursor(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    enumerator(call)?;
    Ok(HostValue::Undefined)
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::IE;

    vec![
        HostClassDescriptor::new("Coordinates")
            .visible_in(IE)
            .illegal_constructor(IE)
            .read_only("latitude", latitude)
            .read_only("longitude", longitude)
            .read_only("accuracy", accuracy),
        HostClassDescriptor::new("Enumerator")
            .visible_in(IE)
            .constructor_with(&["collection"], construct_enumerator, IE)
            .function("atEnd", 0, at_end)
            .function("item", 0, item)
            .function("moveFirst", 0, move_cursor)
            .function("moveNext", 0, move_cursor),
    ]
}

#[cfg(test)]
mod tests {
    use super::super::testing::window;
    use super::*;
    use crate::profile::BrowserProfile;

    #[test]
    fn coordinates_expose_their_fields() {
        let mut host = window("", BrowserProfile::internet_explorer());
        let id = host.create_coordinates(CoordinatesState {
            latitude: 52.5,
            longitude: 13.4,
            accuracy: 10.0,
        });
        let mut call = HostCall::new(&mut host, id, "Coordinates", "latitude", Vec::new());
        assert_eq!(latitude(&mut call), Ok(HostValue::Number(52.5)));
        assert_eq!(accuracy(&mut call), Ok(HostValue::Number(10.0)));
    }

    #[test]
    fn enumerator_rejects_collections() {
        let mut host = window("", BrowserProfile::internet_explorer());
        let mut call = HostCall::new(
            &mut host,
            super::super::WINDOW,
            "Enumerator",
            super::super::CONSTRUCTOR,
            vec![HostValue::Null],
        );
        assert_eq!(
            construct_enumerator(&mut call),
            Err(HostError::type_mismatch("object is not enumerable"))
        );
    }
}
