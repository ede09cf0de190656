use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::Deserialize;

use std::{result, thread, time};

use avl_index::{avl::Index, Config};

use crate::Opt;

/// Load profile, parsed from toml text, missing fields pick their default.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Profile {
    key_max: u64,
    loads: usize,
    sets: usize,
    rems: usize,
    dels: usize,
    gets: usize,
    ranges: usize,
    writers: usize,
    readers: usize,
    auto_compact: Option<usize>,
    compact: bool,
    validate: bool,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile {
            key_max: 10_000_000,
            loads: 1_000_000,
            sets: 1_000_000,
            rems: 100_000,
            dels: 100_000,
            gets: 1_000_000,
            ranges: 1_000,
            writers: 1,
            readers: 1,
            auto_compact: None,
            compact: true,
            validate: true,
        }
    }
}

impl Profile {
    fn reset_writeops(&mut self) {
        self.sets = 0;
        self.rems = 0;
        self.dels = 0;
    }

    fn reset_readops(&mut self) {
        self.gets = 0;
        self.ranges = 0;
    }
}

pub fn perf(opts: Opt, text: &str) -> result::Result<(), String> {
    let p: Profile = toml::from_str(text).map_err(|e| format!("invalid profile {}", e))?;
    if p.key_max == 0 {
        return Err("invalid profile, key_max must be non-zero".to_string());
    }
    println!("avl-perf: seed {}", opts.seed);

    let index = {
        let mut config = Config::new("avl-perf");
        config.set_auto_compact(p.auto_compact);
        Index::<u64, u64>::from_config(config).map_err(|e| e.to_string())?
    };

    let mut rng = SmallRng::seed_from_u64(opts.seed);
    initial_load(&mut rng, &p, &index);

    let mut handles = vec![];
    for j in 0..p.writers {
        let (mut p, index) = (p.clone(), index.clone());
        p.reset_readops();
        let seed = opts.seed.wrapping_add((j as u64) * 100);
        handles.push(thread::spawn(move || incr_load(j, seed, p, index)));
    }
    for j in p.writers..(p.writers + p.readers) {
        let (mut p, index) = (p.clone(), index.clone());
        p.reset_writeops();
        let seed = opts.seed.wrapping_add((j as u64) * 100);
        handles.push(thread::spawn(move || incr_load(j, seed, p, index)));
    }
    for handle in handles.into_iter() {
        handle.join().map_err(|_| "load thread panicked".to_string())?;
    }

    print!("avl-perf: full scan ... ");
    let (elapsed, n) = {
        let start = time::Instant::now();
        let n = index.to_entries().len();
        (start.elapsed(), n)
    };
    println!("{} items, took {:?}", n, elapsed);
    if n != index.len() {
        return Err(format!("scan {} != len {}", n, index.len()));
    }

    println!("avl-perf: index deleted_count:{}", index.deleted_count());
    if p.compact {
        print!("avl-perf: compacting {} deleted ... ", index.deleted_count());
        let start = time::Instant::now();
        index.compact();
        println!("took {:?}", start.elapsed());
    }

    println!("avl-perf: stats {}", index.to_stats().to_json());

    if p.validate {
        print!("avl-perf: validating {} items in index ... ", index.len());
        let start = time::Instant::now();
        let stats = index.validate().map_err(|e| e.to_string())?;
        println!("ok, took {:?}", start.elapsed());
        println!("{}", stats);
    }

    Ok(())
}

fn initial_load(rng: &mut SmallRng, p: &Profile, index: &Index<u64, u64>) {
    let start = time::Instant::now();
    let items: Vec<(u64, u64)> = (0..p.loads)
        .map(|_| (rng.gen::<u64>() % p.key_max, rng.gen()))
        .collect();
    let n = index.set_many(items);

    println!(
        "avl-perf: loaded {} items, {} new, in {:?}",
        p.loads,
        n,
        start.elapsed()
    );
}

fn incr_load(j: usize, seed: u64, p: Profile, index: Index<u64, u64>) {
    let mut rng = SmallRng::seed_from_u64(seed);

    let start = time::Instant::now();
    let (mut sets, mut rems, mut dels, mut gets, mut ranges) =
        (p.sets, p.rems, p.dels, p.gets, p.ranges);
    let (mut n_found, mut n_missed) = (0_usize, 0_usize);
    while (sets + rems + dels + gets + ranges) > 0 {
        let key = rng.gen::<u64>() % p.key_max;
        match rng.gen::<usize>() % (sets + rems + dels + gets + ranges) {
            op if op < sets => {
                index.set(key, rng.gen());
                sets -= 1;
            }
            op if op < (sets + rems) => {
                index.remove(&key);
                rems -= 1;
            }
            op if op < (sets + rems + dels) => {
                match index.delete(&[key]) {
                    true => n_found += 1,
                    false => n_missed += 1,
                }
                dels -= 1;
            }
            op if op < (sets + rems + dels + gets) => {
                match index.get(&key) {
                    Some(_) => n_found += 1,
                    None => n_missed += 1,
                }
                gets -= 1;
            }
            _op => {
                let till = key.saturating_add(1000);
                index.range(&key, &till, true);
                ranges -= 1;
            }
        }
    }

    println!(
        concat!(
            "avl-perf: incremental-{} for (sets:{} rems:{} dels:{} gets:{} ranges:{}) ",
            "found:{} missed:{}, operations took {:?}",
        ),
        j,
        p.sets,
        p.rems,
        p.dels,
        p.gets,
        p.ranges,
        n_found,
        n_missed,
        start.elapsed()
    );
}
