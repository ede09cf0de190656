use rand::prelude::random;
use structopt::StructOpt;

use std::{fs, result};

mod avl;

/// Command line options.
#[derive(Clone, StructOpt)]
pub struct Opt {
    #[structopt(long = "seed", default_value = "0")]
    seed: u64,

    #[structopt(long = "profile", default_value = "")]
    profile: String,
}

fn main() {
    let mut opts = Opt::from_args();
    if opts.seed == 0 {
        opts.seed = random();
    }

    let res = load_profile(&opts).and_then(|text| avl::perf(opts, &text));
    if let Err(err) = res {
        println!("avl-perf: error {}", err);
        std::process::exit(1);
    }
}

// An empty profile path pick all the defaults.
fn load_profile(opts: &Opt) -> result::Result<String, String> {
    match opts.profile.as_str() {
        "" => Ok(String::default()),
        ppath => match fs::read_to_string(ppath) {
            Ok(text) => Ok(text),
            Err(err) => Err(format!("invalid profile {:?}: {}", ppath, err)),
        },
    }
}
