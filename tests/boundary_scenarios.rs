use hostbridge::{BrowserProfile, JsWindow};

#[test]
fn subtle_crypto_constructor_is_illegal_in_chrome() {
    let window = JsWindow::new("<body></body>", BrowserProfile::chrome()).expect("create window");

    let kind: String = window
        .eval_with("typeof SubtleCrypto", "typeof.js")
        .expect("evaluate typeof");
    assert_eq!(kind, "function");

    let message: String = window
        .eval_with(
            r#"
            (function () {
                try {
                    new SubtleCrypto();
                    return "no error";
                } catch (e) {
                    return (e instanceof TypeError ? "TypeError: " : "other: ") + e.message;
                }
            })()
            "#,
            "construct.js",
        )
        .expect("evaluate constructor call");
    assert!(
        message.starts_with("TypeError: ") && message.contains("Illegal constructor"),
        "unexpected constructor failure: {message}"
    );
}

#[test]
fn subtle_crypto_operations_reject_with_type_error() {
    let window = JsWindow::new("<body></body>", BrowserProfile::chrome()).expect("create window");
    window
        .eval(
            r#"
            var outcome = "pending";
            var returned = window.crypto.subtle.generateKey({ name: 'x' });
            returned.catch(function (e) { outcome = e instanceof TypeError; });
            "#,
            "subtle.js",
        )
        .expect("evaluate generateKey");

    let is_promise: bool = window
        .eval_with("returned instanceof Promise", "check.js")
        .expect("inspect return value");
    assert!(is_promise, "generateKey must return a promise");

    let rejected_with_type_error: bool = window
        .eval_with("outcome === true", "check.js")
        .expect("read outcome");
    assert!(rejected_with_type_error, "generateKey should reject with a TypeError");
}

#[test]
fn subtle_crypto_with_full_arguments_rejects_not_supported() {
    let window = JsWindow::new("<body></body>", BrowserProfile::chrome()).expect("create window");
    window
        .eval(
            r#"
            var rejection = null;
            crypto.subtle.digest('SHA-256', new Uint8Array([1, 2, 3]))
                .catch(function (e) { rejection = [e.name, e.code, e instanceof DOMException]; });
            "#,
            "digest.js",
        )
        .expect("evaluate digest");

    let rejection: String = window
        .eval_with("JSON.stringify(rejection)", "check.js")
        .expect("read rejection");
    assert_eq!(rejection, r#"["NotSupportedError",9,true]"#);
}

#[test]
fn hash_change_event_carries_its_urls_in_firefox() {
    let window = JsWindow::new("<body></body>", BrowserProfile::firefox()).expect("create window");
    let fields: String = window
        .eval_with(
            r#"
            var e = new HashChangeEvent('hc', { oldURL: 'a', newURL: 'b' });
            JSON.stringify([e.type, e.oldURL, e.newURL, e.bubbles, e.cancelable, e instanceof Event])
            "#,
            "hashchange.js",
        )
        .expect("construct HashChangeEvent");
    assert_eq!(fields, r#"["hc","a","b",false,false,true]"#);

    let has_init: bool = window
        .eval_with("typeof HashChangeEvent.prototype.initHashChangeEvent === 'function'", "init.js")
        .expect("inspect initHashChangeEvent");
    assert!(has_init, "Firefox exposes initHashChangeEvent");
}

#[test]
fn init_hash_change_event_is_firefox_only() {
    let window = JsWindow::new("<body></body>", BrowserProfile::chrome()).expect("create window");
    let present: bool = window
        .eval_with("'initHashChangeEvent' in HashChangeEvent.prototype", "init.js")
        .expect("inspect prototype");
    assert!(!present);
}

#[test]
fn heading_clear_is_validated_in_internet_explorer() {
    let window = JsWindow::new(
        r#"<body><h1 id="one">One</h1><h2 id="two" clear="middle">Two</h2></body>"#,
        BrowserProfile::internet_explorer(),
    )
    .expect("create window");

    let message: String = window
        .eval_with(
            r#"
            (function () {
                var h1 = document.getElementById('one');
                try {
                    h1.clear = 'center';
                    return "accepted";
                } catch (e) {
                    return e.message;
                }
            })()
            "#,
            "clear-invalid.js",
        )
        .expect("evaluate invalid clear");
    assert_eq!(message, "Invalid clear property value: 'center'.");

    let stored: String = window
        .eval_with(
            "var h1 = document.getElementById('one'); h1.clear = 'left'; h1.clear",
            "clear-valid.js",
        )
        .expect("evaluate valid clear");
    assert_eq!(stored, "left");

    let coerced: String = window
        .eval_with("document.getElementById('two').clear", "clear-read.js")
        .expect("read invalid attribute");
    assert_eq!(coerced, "");

    let html = window.document_html().expect("serialise document");
    assert!(html.contains(r#"clear="left""#), "clear not reflected: {html}");
}

#[test]
fn adopting_a_foreign_style_sheet_is_not_allowed() {
    let window = JsWindow::new(
        r#"<body><div id="host"></div></body>"#,
        BrowserProfile::chrome(),
    )
    .expect("create window");

    let outcome: String = window
        .eval_with(
            r#"
            var root = document.getElementById('host').attachShadow({ mode: 'open' });
            var local = new CSSStyleSheet();
            root.adoptedStyleSheets = [local];

            var other = document.implementation.createHTMLDocument('other');
            var style = other.createElement('style');
            style.textContent = 'p { color: red; }';
            other.body.appendChild(style);
            var foreign = style.sheet;

            var error;
            try {
                root.adoptedStyleSheets = [foreign];
            } catch (e) {
                error = e;
            }
            JSON.stringify([
                String(error),
                error instanceof DOMException,
                root.adoptedStyleSheets.length,
                root.adoptedStyleSheets[0] === local
            ])
            "#,
            "adopt.js",
        )
        .expect("evaluate adoption");

    let parsed: serde_json::Value = serde_json::from_str(&outcome).expect("parse outcome");
    let message = parsed[0].as_str().expect("error string");
    assert!(
        message.starts_with("NotAllowedError: "),
        "unexpected adoption error: {message}"
    );
    assert_eq!(parsed[1], true);
    assert_eq!(parsed[2], 1);
    assert_eq!(parsed[3], true, "previous adopted sheets must be kept");
}

#[test]
fn slot_name_null_is_a_no_op_and_a_new_name_reassigns() {
    let window = JsWindow::new(
        r#"<body><div id="host"><span slot="a">A</span><span>B</span></div></body>"#,
        BrowserProfile::chrome(),
    )
    .expect("create window");

    window
        .eval(
            r#"
            var root = document.getElementById('host').attachShadow({ mode: 'open' });
            root.innerHTML = '<slot name=""></slot>';
            var slot = root.querySelector('slot');
            var changes = 0;
            slot.addEventListener('slotchange', function () { changes += 1; });
            "#,
            "setup.js",
        )
        .expect("set up shadow tree");
    let baseline: i32 = window.eval_with("changes", "read.js").expect("read changes");

    let unchanged: String = window
        .eval_with(
            r#"
            slot.name = null;
            JSON.stringify([slot.getAttribute('name'), slot.assignedNodes()[0].textContent])
            "#,
            "null-name.js",
        )
        .expect("assign null name");
    assert_eq!(unchanged, r#"["","B"]"#);
    let after_null: i32 = window.eval_with("changes", "read.js").expect("read changes");
    assert_eq!(after_null, baseline, "null name must not fire slotchange");

    let assigned: String = window
        .eval_with(
            "slot.name = 'a'; slot.assignedNodes().map(function (n) { return n.textContent; }).join()",
            "named.js",
        )
        .expect("assign name");
    assert_eq!(assigned, "A");
    let after_rename: i32 = window.eval_with("changes", "read.js").expect("read changes");
    assert_eq!(after_rename, baseline + 1);
}

#[test]
fn heading_clear_matches_case_sensitively() {
    let window = JsWindow::new(
        r#"<body><h1 id="upper" clear="LEFT">Upper</h1></body>"#,
        BrowserProfile::internet_explorer(),
    )
    .expect("create window");

    let outcome: String = window
        .eval_with(
            r#"
            var h1 = document.getElementById('upper');
            var read = h1.clear;
            var message;
            try {
                h1.clear = 'RIGHT';
                message = 'accepted';
            } catch (e) {
                message = e.message;
            }
            JSON.stringify([read, message, h1.getAttribute('clear')])
            "#,
            "clear-case.js",
        )
        .expect("evaluate mixed-case clear");
    assert_eq!(
        outcome,
        r#"["","Invalid clear property value: 'RIGHT'.","LEFT"]"#
    );
}
