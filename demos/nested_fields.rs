//! Nested objects and arrays through the marshaling traits.
//!
//! Run with: cargo run --example nested_fields

use logfmt_encoder::{ArrayEncoder, Encoder, MarshalArray, MarshalObject, ObjectEncoder, Result};

struct Person {
    first: &'static str,
    last: &'static str,
    age: i64,
}

impl MarshalObject for Person {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        enc.add_string("first", self.first);
        enc.add_string("last", self.last);
        enc.add_i64("age", self.age);
        Ok(())
    }
}

struct Crew {
    ship: &'static str,
    captain: Person,
}

impl MarshalObject for Crew {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        enc.add_string("ship", self.ship);
        enc.add_object("captain", &self.captain)
    }
}

/// Ports rendered as `host:port` strings.
struct Endpoints(Vec<(&'static str, u16)>);

impl MarshalArray for Endpoints {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        for (host, port) in &self.0 {
            enc.append_string(&format!("{host}:{port}"));
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let mut enc = Encoder::default();

    enc.add_object(
        "identity",
        &Person {
            first: "Arthur",
            last: "Dent",
            age: 42,
        },
    )?;
    enc.add_object(
        "crew",
        &Crew {
            ship: "Heart of Gold",
            captain: Person {
                first: "Zaphod",
                last: "Beeblebrox",
                age: 200,
            },
        },
    )?;
    enc.add_array("values", &[0, 1, 2, 3])?;
    enc.add_array("grid", &vec![vec![1, 2], vec![3]])?;
    enc.add_array("names", &["ford", "zaphod beeblebrox"])?;
    let endpoints = Endpoints(vec![("10.0.0.1", 80), ("10.0.0.2", 8080)]);
    enc.add_array("endpoints", &endpoints)?;

    println!("{}", String::from_utf8_lossy(enc.as_bytes()));
    Ok(())
}
