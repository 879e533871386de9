//! Writing records with typed fields.
//!
//! Run with: cargo run --example simple

use logfmt_encoder::{
    Encoder, EncoderOptions, EncoderPool, Entry, EntryAssembler, Level, ObjectEncoder,
};
use serde::Serialize;
use std::error::Error;
use std::io;
use std::sync::Arc;

#[derive(Serialize)]
struct Request {
    method: &'static str,
    path: &'static str,
    status: u16,
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = EncoderOptions::default();
    let assembler = EntryAssembler::new(Arc::new(EncoderPool::new(options.clone())));
    let mut stdout = io::stdout();

    let mut fields = Encoder::new(options.clone());
    fields.add_string("user", "arthur");
    fields.add_i64("attempt", 3);
    fields.add_f64("score", 0.41666);
    let entry = Entry::new(Level::Warn, "login failed");
    assembler.write_entry(Some(&mut stdout), &entry, &fields)?;

    // Values are quoted only when they have to be.
    let mut fields = Encoder::new(options.clone());
    fields.add_string("path", "/var/log/app.log");
    fields.add_string("reason", "disk \"full\"\nretrying");
    fields.add_byte_string("raw", b"ok\xffok");
    let entry = Entry::new(Level::Error, "write failed");
    assembler.write_entry(Some(&mut stdout), &entry, &fields)?;

    // Any Serialize type can be added as a field.
    let request = Request {
        method: "GET",
        path: "/index.html",
        status: 200,
    };
    let mut fields = Encoder::new(options);
    fields.add_reflected("req", &request)?;
    let entry = Entry::new(Level::Info, "served");
    assembler.write_entry(Some(&mut stdout), &entry, &fields)?;

    let login = Request {
        method: "POST",
        path: "/login",
        status: 401,
    };
    println!();
    println!("Plain field list: {}", logfmt_encoder::to_string(&login)?);

    Ok(())
}
