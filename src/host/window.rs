//! The global `Window` and its `Location`.

use url::Url;

use crate::catalogue::HostClassDescriptor;
use crate::error::{HostError, HostResult};
use crate::profile::BrowserCondition;

use super::events::{get_handler, set_handler};
use super::{
    crypto, EventDetail, EventState, HostCall, HostValue, InstanceState, WindowHost, WINDOW,
};

impl WindowHost {
    /// Move to `target`, which may differ from the current URL only in its
    /// fragment. A changed fragment queues a `hashchange` event on the window.
    pub fn navigate_to_fragment(&mut self, target: Url) -> HostResult<()> {
        let mut without_fragment = target.clone();
        without_fragment.set_fragment(None);
        let mut current = self.url.clone();
        current.set_fragment(None);
        if without_fragment != current {
            return Err(HostError::not_supported(format!(
                "navigation to '{target}' is not supported"
            )));
        }
        if target.fragment() == self.url.fragment() {
            return Ok(());
        }

        let old_url = std::mem::replace(&mut self.url, target).to_string();
        let new_url = self.url.to_string();
        tracing::debug!(target: "hostbridge::host", %old_url, %new_url, "fragment navigation");
        let event = self.create_event(
            "HashChangeEvent",
            EventState::trusted("hashchange", false, false)
                .with_detail(EventDetail::HashChange { old_url, new_url }),
        );
        self.fire_event(WINDOW, event);
        Ok(())
    }
}

fn window(_call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(WINDOW.into())
}

fn document(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.document_instance()?.into())
}

fn location(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.singleton("Location", || InstanceState::Location).into())
}

fn get_computed_style(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    call.require_args(1)?;
    let element = call.node_arg(0)?;
    Ok(call.host.computed_style_of(element).into())
}

fn href(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.url().to_string().into())
}

fn set_href(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let raw = call.string_arg(0);
    let target = call
        .host
        .url()
        .join(&raw)
        .map_err(|err| HostError::type_mismatch(format!("Failed to set the 'href' property on 'Location': {err}")))?;
    call.host.navigate_to_fragment(target)?;
    Ok(HostValue::Undefined)
}

fn hash(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let hash = match call.host.url().fragment() {
        Some(fragment) if !fragment.is_empty() => format!("#{fragment}"),
        _ => String::new(),
    };
    Ok(hash.into())
}

fn set_hash(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let raw = call.string_arg(0);
    let fragment = raw.strip_prefix('#').unwrap_or(&raw);
    let mut target = call.host.url().clone();
    target.set_fragment(Some(fragment));
    call.host.navigate_to_fragment(target)?;
    Ok(HostValue::Undefined)
}

fn protocol(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(format!("{}:", call.host.url().scheme()).into())
}

fn host_name(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.url().host_str().unwrap_or_default().into())
}

fn pathname(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    Ok(call.host.url().path().into())
}

fn search(call: &mut HostCall<'_>) -> HostResult<HostValue> {
    let search = match call.host.url().query() {
        Some(query) if !query.is_empty() => format!("?{query}"),
        _ => String::new(),
    };
    Ok(search.into())
}

pub(super) fn descriptors() -> Vec<HostClassDescriptor> {
    use BrowserCondition::*;

    vec![
        HostClassDescriptor::new("Window")
            .extends("EventTarget")
            .illegal_constructor(Any)
            .read_only("window", window)
            .read_only("self", window)
            .read_only("document", document)
            .read_only("location", location)
            .read_only("crypto", crypto::crypto)
            .only(ChromeAndEdgeAndFirefox)
            .function("getComputedStyle", 1, get_computed_style)
            .property("onhashchange", get_handler, Some(set_handler))
            .property("onload", get_handler, Some(set_handler)),
        HostClassDescriptor::new("Location")
            .illegal_constructor(Any)
            .property("href", href, Some(set_href))
            .property("hash", hash, Some(set_hash))
            .read_only("protocol", protocol)
            .read_only("hostname", host_name)
            .read_only("pathname", pathname)
            .read_only("search", search)
            .function("toString", 0, href),
    ]
}
