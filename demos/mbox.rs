use logrec::{Engine, FileSource, Options, ReaderSource, Value};
use tracing_subscriber::EnvFilter;

const RULES: &str = r#"
# one record per message in an mbox file
/^From \S+ .*$/
    eval incr("messages")
    /^From (\S+)/
        envelope = _g1
/^From: (.*?)\s*(?:<(.*)>)?$/
    from = _g1
    email = default(_g2, _g1)
/^Subject: (.*)$/
    subject = _g1
/^Date: (.*)$/
    date = _g1
/^$/
    flush
    clear
"#;

const SAMPLE: &str = "\
From alice@example.org Mon Jan  1 09:00:00 2024
From: Alice <alice@example.org>
Subject: Quarterly numbers
Date: Mon, 1 Jan 2024 09:00:00 +0000

Body text.
From bob@example.org Tue Jan  2 10:30:00 2024
From: bob@example.org
Subject: Re: Quarterly numbers
Date: Tue, 2 Jan 2024 10:30:00 +0000

";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let debug = std::env::var_os("RUST_LOG").is_some();
    let mut engine = Engine::new(RULES, Options::default().debug(debug).eof_flush(true))
        .expect("failed to compile rules");

    let records = match std::env::args().nth(1) {
        Some(path) => {
            let source = FileSource::open(&path).expect("failed to open mailbox");
            engine.collect(source)
        }
        None => engine.collect(ReaderSource::from(SAMPLE)),
    }
    .expect("failed to read mailbox");

    for record in records.iter().filter(|r| !r.is_empty()) {
        println!("{record}");
    }
    let messages = match engine.globals().get("messages") {
        Some(Value::Int(n)) => *n,
        _ => 0,
    };
    println!("{messages} messages");
}
