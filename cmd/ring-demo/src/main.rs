//! Ring-backed `Buffer` example.
//!
//! Demonstrates a bounded ring buffer wrapping around, and a COW clone
//! staying unaffected by the writes that happen after it was taken.

use abe::prelude::*;

fn main() {
    println!("=== Ring buffer demo ===\n");

    let mut ring = Buffer::with_type(16, BufferType::Ring);
    for round in 0..4 {
        ring.write_bytes(format!("r{round}-payload").as_bytes());
        let chunk = ring.read_bytes(ring.size());
        println!("round {round}: {}", String::from_utf8_lossy(&chunk));
    }

    let mut linear = Buffer::new(32);
    linear.write_bytes(b"before");
    let mut snapshot = linear.clone_bytes();
    linear.write_bytes(b"-after");

    println!(
        "snapshot still reads: {:?}, live buffer now has {} bytes pending",
        String::from_utf8_lossy(&snapshot.read_bytes(6)),
        linear.size(),
    );
}
