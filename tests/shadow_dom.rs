use hostbridge::{BrowserProfile, JsWindow};

const LIGHT_DOM: &str = r#"<body>
<div id="card"><h2 slot="title">Title</h2><p>Body text</p>tail</div>
<span id="inline"></span>
<img id="image">
</body>"#;

#[test]
fn attach_shadow_exposes_open_roots_only() {
    let window = JsWindow::new(LIGHT_DOM, BrowserProfile::chrome()).expect("create window");
    let state: String = window
        .eval_with(
            r#"
            var card = document.getElementById('card');
            var open = card.attachShadow({ mode: 'open', delegatesFocus: true });
            var closed = document.getElementById('inline').attachShadow({ mode: 'closed' });
            JSON.stringify([
                card.shadowRoot === open,
                open instanceof ShadowRoot,
                open instanceof DocumentFragment,
                open.mode,
                open.host === card,
                open.delegatesFocus,
                open.slotAssignment,
                closed.mode,
                document.getElementById('inline').shadowRoot
            ])
            "#,
            "attach.js",
        )
        .expect("attach shadow roots");
    assert_eq!(state, r#"[true,true,true,"open",true,true,"named","closed",null]"#);
}

#[test]
fn attach_shadow_rejects_bad_hosts_and_modes() {
    let window = JsWindow::new(LIGHT_DOM, BrowserProfile::firefox()).expect("create window");
    let errors: String = window
        .eval_with(
            r#"
            function attempt(fn) {
                try { fn(); return 'ok'; } catch (e) { return e.name; }
            }
            var card = document.getElementById('card');
            JSON.stringify([
                attempt(function () { document.getElementById('image').attachShadow({ mode: 'open' }); }),
                attempt(function () { card.attachShadow({}); }),
                attempt(function () { card.attachShadow({ mode: 'sideways' }); }),
                attempt(function () { card.attachShadow({ mode: 'open' }); }),
                attempt(function () { card.attachShadow({ mode: 'open' }); })
            ])
            "#,
            "attach-errors.js",
        )
        .expect("attempt attachments");
    assert_eq!(
        errors,
        r#"["NotSupportedError","TypeError","TypeError","ok","NotSupportedError"]"#
    );
}

#[test]
fn named_and_default_slots_distribute_light_children() {
    let window = JsWindow::new(LIGHT_DOM, BrowserProfile::chrome()).expect("create window");
    let distribution: String = window
        .eval_with(
            r#"
            var root = document.getElementById('card').attachShadow({ mode: 'open' });
            root.innerHTML = '<header><slot name="title"></slot></header><slot id="rest"><em>fallback</em></slot>';
            var named = root.querySelector('slot[name="title"]');
            var rest = root.getElementById('rest');
            function names(nodes) {
                return nodes.map(function (n) { return n.nodeType === 3 ? '#text:' + n.data : n.tagName; });
            }
            JSON.stringify([
                names(named.assignedNodes()),
                names(rest.assignedNodes()),
                names(rest.assignedElements()),
                root.innerHTML.indexOf('<header>') === 0
            ])
            "#,
            "distribute.js",
        )
        .expect("distribute slots");
    assert_eq!(
        distribution,
        r##"[["H2"],["P","#text:tail"],["P"],true]"##
    );
}

#[test]
fn empty_slot_flattens_to_fallback_content() {
    let window = JsWindow::new(r#"<body><div id="host"></div></body>"#, BrowserProfile::edge())
        .expect("create window");
    let flattened: String = window
        .eval_with(
            r#"
            var root = document.getElementById('host').attachShadow({ mode: 'open' });
            root.innerHTML = '<slot><b>fallback</b></slot>';
            var slot = root.querySelector('slot');
            JSON.stringify([
                slot.assignedNodes().length,
                slot.assignedNodes({ flatten: true }).map(function (n) { return n.tagName; })
            ])
            "#,
            "flatten.js",
        )
        .expect("flatten slot");
    assert_eq!(flattened, r#"[0,["B"]]"#);
}

#[test]
fn light_dom_changes_fire_slotchange() {
    let window = JsWindow::new(LIGHT_DOM, BrowserProfile::chrome()).expect("create window");
    window
        .eval(
            r#"
            var card = document.getElementById('card');
            var root = card.attachShadow({ mode: 'open' });
            root.innerHTML = '<slot name="title"></slot><slot></slot>';
            var titleSlot = root.querySelector('slot');
            var fired = [];
            titleSlot.addEventListener('slotchange', function (e) {
                fired.push(e.target === titleSlot, e.bubbles);
            });
            "#,
            "setup.js",
        )
        .expect("set up shadow tree");

    let before: String = window
        .eval_with(
            r#"
            fired.length = 0;
            var replacement = document.createElement('h3');
            replacement.slot = 'title';
            card.appendChild(replacement);
            JSON.stringify(fired)
            "#,
            "append.js",
        )
        .expect("append slottable");
    assert_eq!(before, "[]", "slotchange must wait for the end of the script");

    let after: String = window
        .eval_with(
            "JSON.stringify([fired, titleSlot.assignedNodes().length])",
            "read.js",
        )
        .expect("read slotchange");
    assert_eq!(after, "[[true,true],2]");
}

#[test]
fn manual_assignment_uses_assigned_nodes() {
    let window = JsWindow::new(LIGHT_DOM, BrowserProfile::chrome()).expect("create window");
    let assigned: String = window
        .eval_with(
            r#"
            var card = document.getElementById('card');
            var root = card.attachShadow({ mode: 'open', slotAssignment: 'manual' });
            root.innerHTML = '<slot id="only"></slot>';
            var slot = root.getElementById('only');
            var paragraph = card.querySelector('p');
            var before = slot.assignedNodes().length;
            slot.assign(paragraph);
            JSON.stringify([root.slotAssignment, before, slot.assignedElements()[0] === paragraph])
            "#,
            "manual.js",
        )
        .expect("assign manually");
    assert_eq!(assigned, r#"["manual",0,true]"#);
}

#[test]
fn shadow_content_stays_out_of_the_document() {
    let window = JsWindow::new(LIGHT_DOM, BrowserProfile::chrome()).expect("create window");
    window
        .eval(
            r#"
            var root = document.getElementById('card').attachShadow({ mode: 'open' });
            root.innerHTML = '<section id="private">hidden</section>';
            "#,
            "shadow.js",
        )
        .expect("populate shadow root");

    let missing: bool = window
        .eval_with("document.getElementById('private') === null", "lookup.js")
        .expect("query document");
    assert!(missing);

    let html = window.document_html().expect("serialise document");
    assert!(!html.contains("private"), "shadow content leaked into {html}");
    assert!(html.contains(r#"<h2 slot="title">Title</h2>"#));
}
