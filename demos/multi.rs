use logrec::{Engine, MultiSource, Options};
use tracing_subscriber::EnvFilter;

const RULES: &str = r#"
/^<<< (.*)$/
    file = _g1
    errors = 0
/^ERROR (.*)$/
    last_error = _g1
    eval incr("errors_total")
    errors = errors_total
/^>>>$/
    flush
    clear
"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: multi <log file>...");
        std::process::exit(2);
    }

    let source = MultiSource::from_paths(paths)
        .on_start(|name| name.map(|n| format!("<<< {n}")))
        .on_end(|_| Some(">>>".to_owned()));

    let mut engine = Engine::new(RULES, Options::default()).expect("failed to compile rules");
    for record in engine.records(source) {
        match record {
            Ok(record) => println!("{record}"),
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
}
