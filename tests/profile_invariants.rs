use hostbridge::catalogue::{ConstructorKind, FunctionImpl, MemberDescriptor};
use hostbridge::{BrowserProfile, Catalogue, JsWindow};

fn window_for(profile: &BrowserProfile) -> JsWindow {
    JsWindow::new(
        r#"<body><div id="host"><p>light</p></div></body>"#,
        profile.clone(),
    )
    .expect("create window")
}

fn script_bool(window: &JsWindow, source: &str) -> bool {
    window
        .eval_with(source, "invariant.js")
        .unwrap_or_else(|err| panic!("evaluating {source}: {err}"))
}

#[test]
fn visible_members_belong_to_visible_classes() {
    let catalogue = Catalogue::builtin().expect("builtin catalogue");
    for profile in BrowserProfile::presets() {
        let window = window_for(&profile);
        for descriptor in catalogue.all_descriptors() {
            let name = descriptor.name;
            let exposed = script_bool(&window, &format!("typeof globalThis['{name}'] !== 'undefined'"));
            assert_eq!(
                exposed,
                descriptor.is_visible(&profile),
                "{name} exposure mismatch in {profile}"
            );
            let members = catalogue.visible_members(name, &profile);
            if !descriptor.is_visible(&profile) {
                assert!(members.is_empty(), "{name} hides its class but exposes members in {profile}");
                continue;
            }
            for entry in members.iter().filter(|entry| entry.declared_by == name) {
                let member = entry.member.name();
                let present = script_bool(&window, &format!("'{member}' in {name}.prototype"));
                assert!(present, "{name}.prototype.{member} missing in {profile}");
            }
        }
    }
}

#[test]
fn illegal_constructors_throw_type_errors_but_keep_prototypes() {
    let catalogue = Catalogue::builtin().expect("builtin catalogue");
    for profile in BrowserProfile::presets() {
        let window = window_for(&profile);
        for descriptor in catalogue.all_descriptors() {
            if !descriptor.is_visible(&profile) {
                continue;
            }
            let Some(rule) = descriptor.constructor_for(&profile) else {
                continue;
            };
            if !matches!(rule.kind, ConstructorKind::ThrowsIllegal) {
                continue;
            }
            let name = descriptor.name;
            let source = format!(
                r#"
                (function () {{
                    var threw = false;
                    try {{ new {name}(); }} catch (e) {{ threw = e instanceof TypeError; }}
                    return threw && typeof {name}.prototype === 'object'
                        && {name}.prototype.constructor === {name};
                }})()
                "#
            );
            assert!(script_bool(&window, &source), "{name} constructor in {profile}");
        }
    }
}

#[test]
fn async_members_never_throw_synchronously() {
    let catalogue = Catalogue::builtin().expect("builtin catalogue");
    for profile in BrowserProfile::presets() {
        let window = window_for(&profile);
        for descriptor in catalogue.all_descriptors() {
            let name = descriptor.name;
            for entry in catalogue.visible_members(name, &profile) {
                let MemberDescriptor::Function {
                    name: member,
                    implementation: FunctionImpl::Async(_),
                    ..
                } = entry.member
                else {
                    continue;
                };
                if entry.declared_by != name {
                    continue;
                }
                let source = format!(
                    r#"
                    (function () {{
                        var method = {name}.prototype.{member};
                        var receivers = [undefined, {{}}, document.body];
                        if (typeof AudioContext === 'function') receivers.push(new AudioContext());
                        if (typeof CSSStyleSheet === 'function' && typeof CSSStyleSheet.prototype.replace === 'function') {{
                            receivers.push(new CSSStyleSheet());
                        }}
                        if (globalThis.crypto) receivers.push(crypto.subtle);
                        var args = [[], [1, 2, 3], [null, 'x', {{}}, 4, 5, 6, 7]];
                        for (var i = 0; i < receivers.length; i++) {{
                            for (var j = 0; j < args.length; j++) {{
                                var result = method.apply(receivers[i], args[j]);
                                if (!(result instanceof Promise) && result !== undefined) {{
                                    return false;
                                }}
                                if (result instanceof Promise) {{
                                    result.catch(function () {{}});
                                }}
                            }}
                        }}
                        return true;
                    }})()
                    "#
                );
                assert!(
                    script_bool(&window, &source),
                    "{name}.{member} threw or returned a non-promise in {profile}"
                );
            }
        }
    }
}

#[test]
fn shadow_root_reassigning_adopted_sheets_is_stable() {
    for profile in BrowserProfile::presets() {
        if profile.is_ie() {
            continue;
        }
        let window = window_for(&profile);
        let stable = script_bool(
            &window,
            r#"
            var root = document.getElementById('host').attachShadow({ mode: 'open' });
            var first = new CSSStyleSheet();
            var second = new CSSStyleSheet();
            root.adoptedStyleSheets = [first, second];
            root.adoptedStyleSheets = root.adoptedStyleSheets;
            var sheets = root.adoptedStyleSheets;
            sheets.length === 2 && sheets[0] === first && sheets[1] === second
            "#,
        );
        assert!(stable, "adoptedStyleSheets self-assignment changed the list in {profile}");
    }
}

#[test]
fn attribute_round_trip_normalises_html_names() {
    for profile in BrowserProfile::presets() {
        let window = window_for(&profile);
        let round_trip: String = window
            .eval_with(
                r#"
                var p = document.querySelector('p');
                p.setAttribute('data-value', 'kept');
                p.setAttribute('Data-Mixed', 'lowered');
                JSON.stringify([
                    p.getAttribute('data-value'),
                    p.getAttribute('data-mixed'),
                    p.hasAttribute('DATA-MIXED')
                ])
                "#,
                "attributes.js",
            )
            .expect("round-trip attributes");
        assert_eq!(round_trip, r#"["kept","lowered",true]"#, "in {profile}");
    }
}

#[test]
fn internet_explorer_surface() {
    let window = JsWindow::new(
        r#"<body><blockquote id="quote" cite="http://example.test/">q</blockquote></body>"#,
        BrowserProfile::internet_explorer(),
    )
    .expect("create window");

    let summary: String = window
        .eval_with(
            r#"
            var quote = document.getElementById('quote');
            var failed;
            try { new Enumerator([1]); } catch (e) { failed = e instanceof TypeError; }
            JSON.stringify([
                typeof SubtleCrypto,
                typeof ShadowRoot,
                quote instanceof HTMLBlockElement,
                quote.cite,
                new Enumerator() instanceof Enumerator,
                failed
            ])
            "#,
            "ie.js",
        )
        .expect("inspect IE surface");
    assert_eq!(
        summary,
        r#"["object","undefined",true,"http://example.test/",true,true]"#
    );

    let modern = JsWindow::new("<body></body>", BrowserProfile::chrome()).expect("create window");
    let hidden: bool = modern
        .eval_with(
            "typeof HTMLBlockElement === 'undefined' && typeof Enumerator === 'undefined'",
            "chrome.js",
        )
        .expect("inspect Chrome surface");
    assert!(hidden);
}

#[test]
fn audio_nodes_require_a_context() {
    let window = JsWindow::new("<body></body>", BrowserProfile::chrome()).expect("create window");
    let outcome: String = window
        .eval_with(
            r#"
            function attempt(fn) {
                try { fn(); return 'ok'; } catch (e) { return (e instanceof TypeError) + ':' + e.message; }
            }
            var context = new AudioContext();
            var gain = new GainNode(context);
            JSON.stringify([
                attempt(function () { new GainNode({}); }),
                attempt(function () { new AudioBufferSourceNode(); }),
                gain.context === context,
                gain instanceof AudioNode,
                gain.connect(context.createGain()) instanceof GainNode
            ])
            "#,
            "audio.js",
        )
        .expect("construct audio nodes");
    assert_eq!(
        outcome,
        concat!(
            r#"["true:Failed to construct 'GainNode': first parameter is not of type 'BaseAudioContext'.","#,
            r#""true:Failed to construct 'AudioBufferSourceNode': first parameter is not of type 'BaseAudioContext'.","#,
            "true,true,true]"
        )
    );
}

#[test]
fn decode_audio_data_reports_failure_after_the_script() {
    let window = JsWindow::new("<body></body>", BrowserProfile::firefox()).expect("create window");
    window
        .eval(
            r#"
            var context = new AudioContext();
            var calls = [];
            var rejection = null;
            var returned = context.decodeAudioData(new ArrayBuffer(8), function () {
                calls.push('success');
            }, function () {
                calls.push([this === context, arguments.length]);
            });
            var synchronous = calls.length;
            context.decodeAudioData(new ArrayBuffer(8)).catch(function (e) { rejection = e.name; });
            "#,
            "decode.js",
        )
        .expect("decode audio data");

    let outcome: String = window
        .eval_with(
            "JSON.stringify([returned === undefined, synchronous, calls, rejection])",
            "decode-read.js",
        )
        .expect("read decode outcome");
    assert_eq!(outcome, r#"[true,0,[[true,0]],"NotSupportedError"]"#);
}

#[test]
fn svg_classes_expose_their_constants() {
    for profile in BrowserProfile::presets() {
        let window = JsWindow::new(
            r#"<body><svg><textPath id="path">hi</textPath><feDisplacementMap id="map"/></svg></body>"#,
            profile.clone(),
        )
        .expect("create window");
        let constants: String = window
            .eval_with(
                r#"
                var path = document.getElementById('path');
                var map = document.getElementById('map');
                JSON.stringify([
                    path instanceof SVGTextPathElement,
                    path instanceof SVGTextContentElement,
                    path.TEXTPATH_METHODTYPE_STRETCH,
                    SVGTextPathElement.TEXTPATH_SPACINGTYPE_EXACT,
                    path.getNumberOfChars(),
                    map instanceof SVGFEDisplacementMapElement,
                    SVGFEDisplacementMapElement.SVG_CHANNEL_A,
                    map.SVG_CHANNEL_R
                ])
                "#,
                "svg.js",
            )
            .expect("inspect SVG elements");
        assert_eq!(constants, "[true,true,2,2,2,true,4,1]", "in {profile}");
    }
}
