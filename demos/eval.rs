use std::env::args;

use feval::eval_str;

const USAGE: &str = r"Expression evaluation.

Usage: eval EXPR1 EXPR2 ...";

fn main() {
    let args: Vec<String> = args().skip(1).collect();
    if args.is_empty() {
        println!("{}", USAGE);
    }
    for arg in &args {
        match eval_str(arg) {
            Ok(value) => println!("{} = {}", arg, value),
            Err(e) => println!("Error when evaluating `{}`: {}", arg, e),
        }
    }
}
