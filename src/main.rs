extern crate chordscope;
extern crate docopt;
#[macro_use]
extern crate serde_derive;

use docopt::Docopt;

const USAGE: &'static str = "
Chordscope.

Names the chord formed by the given MIDI note numbers.

Usage:
  chordscope <note>...
  chordscope (-h | --help)
  chordscope --version

Options:
  -h --help     Show this screen.
  --version     Show the version.
";

#[derive(Debug, Deserialize)]
struct Args {
    arg_note: Vec<i32>,
    flag_version: bool,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if args.flag_version {
        println!("v0.1.0");
        return;
    }

    let name = chordscope::name_chord(&args.arg_note);
    if name.is_empty() {
        println!("(no chord)");
    } else {
        println!("{}", name);
    }
}
