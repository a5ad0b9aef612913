use anyhow::{Context, Result};
use std::io::Read;
use std::{env, fs, process};

use vellum_engine::parse;

struct Options {
    input: Option<String>,
    cursor: Option<usize>,
    dump_spans: bool,
}

fn usage() -> ! {
    eprintln!("Usage: vellum-cli [--cursor OFFSET] [--dump-spans] [FILE]");
    eprintln!();
    eprintln!("Parses HTML from FILE (or stdin) and prints the normalized");
    eprintln!("serialization. --dump-spans prints the span table to stderr;");
    eprintln!("--cursor injects a cursor marker at the given byte offset.");
    process::exit(2);
}

fn parse_args() -> Options {
    let mut options = Options {
        input: None,
        cursor: None,
        dump_spans: false,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-spans" => options.dump_spans = true,
            "--cursor" => {
                let Some(value) = args.next() else { usage() };
                match value.parse() {
                    Ok(offset) => options.cursor = Some(offset),
                    Err(_) => usage(),
                }
            }
            "--help" | "-h" => usage(),
            _ if arg.starts_with('-') => usage(),
            _ if options.input.is_none() => options.input = Some(arg),
            _ => usage(),
        }
    }
    options
}

fn main() -> Result<()> {
    let options = parse_args();

    let html = match &options.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let doc = parse(&html);

    if options.dump_spans {
        for (id, span) in doc.spans().iter() {
            eprintln!(
                "{id:?}: {:?} [{}..{}) nesting={} {}",
                span.kind,
                span.start,
                span.end,
                span.nesting,
                span.attributes
            );
        }
    }

    let output = match options.cursor {
        Some(offset) => doc.to_html_with_cursor(offset),
        None => doc.to_html(),
    };
    println!("{output}");
    Ok(())
}
