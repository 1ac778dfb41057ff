// Standalone binary exercising the compiler pipeline directly, the way
// the teacher's own `src/bin/preview.rs` exercised its renderer directly:
// read one expression from a file (or stdin), compile it, print its hex
// instruction stream and symbol tables.

use std::env::args;
use std::io::{stdin, Read};

use shimeji_ctl::{bytecode, serializer};

fn main() {
    let expression = match args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).expect("couldn't read expression file"),
        None => {
            let mut buf = String::new();
            stdin().read_to_string(&mut buf).expect("couldn't read stdin");
            buf
        }
    };

    let program = bytecode::compile(expression.trim(), Vec::new(), Vec::new(), Vec::new())
        .expect("couldn't compile expression");
    let emitted = serializer::emit(&program).expect("couldn't serialize program");

    println!("instructions: {}", emitted.instructions);
    println!("locals:       {:?}", emitted.local_vars);
    println!("globals:      {:?}", emitted.global_vars);
    println!("functions:    {:?}", emitted.functions);
    println!("evaluate_once: {}", emitted.evaluate_once);
}
