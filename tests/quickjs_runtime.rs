use hostbridge::js::runtime::QuickJsEngine;

#[test]
fn quickjs_executes_inline_script() {
    let engine = QuickJsEngine::new().expect("engine");
    let result: i32 = engine
        .eval_with(
            "(() => { console.log('hello from test'); return 40 + 2; })()",
            "quickjs_runtime_test.js",
        )
        .expect("script result");
    assert_eq!(result, 42);
}

#[test]
fn quickjs_reports_uncaught_errors_with_their_name() {
    let engine = QuickJsEngine::new().expect("engine");
    let err = engine
        .eval("null.property", "failing.js")
        .expect_err("script should fail");
    assert!(err.to_string().starts_with("TypeError"), "unexpected error: {err}");

    let value: i32 = engine
        .eval_with("1 + 1", "after.js")
        .expect("engine usable after an error");
    assert_eq!(value, 2);
}
