use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use variant_stream::ParserBuilder;

/// Measures full-sequence consumption over a synthetic shape corpus:
/// equal parts circles, lines, triangles and rectangles, with an optional
/// "dynamic" half of unregistered elements to exercise the unknown path.
#[derive(Parser, Debug)]
#[command(name = "benchmark", about = "Throughput benchmark for discriminator-routed parsing")]
struct Args {
    /// Total number of array elements to generate
    #[arg(long, default_value_t = 12_000)]
    total: usize,

    /// Make half the corpus unregistered discriminators
    #[arg(long)]
    dynamic: bool,

    /// Number of timed runs
    #[arg(long, default_value_t = 20)]
    runs: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Circle {
    radius: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Line {
    length: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Triangle {
    base: i64,
    height: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Rectangle {
    width: i64,
    height: i64,
}

#[derive(Debug)]
enum Shape {
    Circle(Circle),
    Line(Line),
    Triangle(Triangle),
    Rectangle(Rectangle),
}

impl From<Circle> for Shape {
    fn from(c: Circle) -> Self {
        Shape::Circle(c)
    }
}

impl From<Line> for Shape {
    fn from(l: Line) -> Self {
        Shape::Line(l)
    }
}

impl From<Triangle> for Shape {
    fn from(t: Triangle) -> Self {
        Shape::Triangle(t)
    }
}

impl From<Rectangle> for Shape {
    fn from(r: Rectangle) -> Self {
        Shape::Rectangle(r)
    }
}

fn build_corpus(total: usize, dynamic: bool) -> Value {
    let per_shape = if dynamic { total / 2 / 4 } else { total / 4 };
    let unknown = if dynamic { total / 2 } else { 0 };

    let mut objects = Vec::with_capacity(per_shape * 4 + unknown);
    for i in 1..=per_shape {
        objects.push(json!({"Type": "circle", "Radius": i}));
    }
    for i in 1..=per_shape {
        objects.push(json!({"Type": "line", "Length": i}));
    }
    for i in 1..=per_shape {
        objects.push(json!({"Type": "triangle", "Base": i, "Height": i}));
    }
    for i in 1..=per_shape {
        objects.push(json!({"Type": "rectangle", "Width": i, "Height": i}));
    }
    for i in 1..=unknown {
        objects.push(json!({"Type": "unknown", "Value": i}));
    }
    Value::Array(objects)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let parser = ParserBuilder::<Shape>::new("Type")
        .map::<Circle>("circle")?
        .map::<Line>("line")?
        .map::<Triangle>("triangle")?
        .map::<Rectangle>("rectangle")?
        .build()?;

    let corpus = build_corpus(args.total, args.dynamic);
    let element_count = corpus.as_array().map_or(0, Vec::len);
    println!(
        "corpus: {} elements (dynamic: {}), {} timed runs",
        element_count, args.dynamic, args.runs
    );

    let mut best = f64::INFINITY;
    let mut total_secs = 0.0;
    let mut decoded = 0usize;
    let mut failed = 0usize;
    let mut checksum = 0i64;

    for run in 0..args.runs {
        decoded = 0;
        failed = 0;
        checksum = 0;

        let started = Instant::now();
        for outcome in parser.parse(&corpus) {
            match outcome.into_value() {
                Ok(shape) => {
                    decoded += 1;
                    checksum += match shape {
                        Shape::Circle(c) => c.radius,
                        Shape::Line(l) => l.length,
                        Shape::Triangle(t) => t.base + t.height,
                        Shape::Rectangle(r) => r.width + r.height,
                    };
                }
                Err(_) => failed += 1,
            }
        }
        let secs = started.elapsed().as_secs_f64();

        total_secs += secs;
        if secs < best {
            best = secs;
        }
        println!(
            "run {:>3}: {:.3} ms ({:.0} elements/sec)",
            run + 1,
            secs * 1e3,
            element_count as f64 / secs
        );
    }

    println!();
    println!("decoded {decoded}, failed {failed} per pass (checksum {checksum})");
    println!(
        "best {:.3} ms, mean {:.3} ms, peak {:.0} elements/sec",
        best * 1e3,
        total_secs / args.runs as f64 * 1e3,
        element_count as f64 / best
    );

    Ok(())
}
