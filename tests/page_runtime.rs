use std::io::Write;

use hostbridge::js::ScriptExecution;
use hostbridge::{HostConfig, PageRuntime};
use tempfile::NamedTempFile;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <script src="vendor.js" defer></script>
  <script type="application/json">{"ignored": true}</script>
</head>
<body onload="document.getElementById('status').textContent = 'loaded:' + event.type">
  <p id="status">pending</p>
  <ul id="list"></ul>
  <button id="button" onclick="window.clicks = (window.clicks || 0) + 1">Add</button>
  <script>
    var list = document.getElementById('list');
    ['a', 'b'].forEach(function (label) {
      var item = document.createElement('li');
      item.textContent = label;
      list.appendChild(item);
    });
  </script>
  <script>
    undefinedFunction();
  </script>
  <script>
    document.getElementById('button').dispatchEvent(new Event('click'));
    document.getElementById('button').addEventListener('click', function () {
      throw new Error('listener exploded');
    });
    document.getElementById('button').dispatchEvent(new Event('click'));
  </script>
</body>
</html>"#;

#[test]
fn page_run_executes_inline_scripts_and_fires_load() {
    let mut page = PageRuntime::load(PAGE, &HostConfig::default()).expect("load page");

    let scripts = page.scripts();
    assert_eq!(scripts.len(), 5, "every non-empty script is collected");
    assert_eq!(scripts[0].execution, ScriptExecution::Defer);

    let summary = page.run().expect("run page");
    assert_eq!(summary.profile, "Chrome105");
    assert_eq!(summary.executed_scripts, 2);
    assert_eq!(summary.failed_scripts, 1);
    assert_eq!(summary.skipped_scripts, 2);
    assert_eq!(summary.event_handlers, 2);
    assert!(summary.dom_mutations > 0);
    assert_eq!(summary.runtime_errors.len(), 1);
    assert!(summary.runtime_errors[0].contains("listener exploded"));

    let window = page.window();
    let clicks: i32 = window.eval_with("window.clicks", "clicks.js").expect("read clicks");
    assert_eq!(clicks, 2);

    let html = window.document_html().expect("serialise document");
    assert!(html.contains(r#"<p id="status">loaded:load</p>"#), "load handler did not run: {html}");
    assert!(html.contains("<li>a</li><li>b</li>"), "list not populated: {html}");
}

#[test]
fn page_runtime_honours_config_file() {
    let mut file = NamedTempFile::new().expect("create config file");
    writeln!(
        file,
        "browser: firefox\nurl: http://example.test/app/index.html?mode=test"
    )
    .expect("write config");
    let config = HostConfig::load(Some(file.path().to_path_buf())).expect("load config");

    let mut page = PageRuntime::load(
        r#"<body><script>window.where = location.pathname + location.search;</script></body>"#,
        &config,
    )
    .expect("load page");
    let summary = page.run().expect("run page");
    assert_eq!(summary.profile, "FF104");
    assert_eq!(summary.executed_scripts, 1);

    let window = page.into_window();
    let location: String = window.eval_with("where", "where.js").expect("read location");
    assert_eq!(location, "/app/index.html?mode=test");
    let has_block: bool = window
        .eval_with("typeof HTMLBlockElement !== 'undefined'", "ie-only.js")
        .expect("inspect globals");
    assert!(!has_block);
}

#[test]
fn summary_is_reported_as_json() {
    let mut page = PageRuntime::load(
        "<body><script>document.body.setAttribute('data-ready', 'yes');</script></body>",
        &HostConfig::default(),
    )
    .expect("load page");
    let summary = page.run().expect("run page");
    let json = serde_json::to_value(&summary).expect("serialise summary");
    assert_eq!(json["executed_scripts"], 1);
    assert_eq!(json["failed_scripts"], 0);
    assert!(json["runtime_errors"].as_array().expect("errors array").is_empty());
}
