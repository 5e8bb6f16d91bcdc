// cell resampling with a user-defined distance
// run with `cargo run --release --example user_distance`
// set the environment variable `RUST_LOG=info` for command-line output
use anyhow::Result;
use noisy_float::prelude::*;

use recell::distance::Distance;
use recell::event::Event;
use recell::prelude::*;

// this distance is just for demonstration
// and doesn't make much sense physically
struct MyDistance {
    e_fact: N64,
}

impl Distance for MyDistance {
    fn distance(&self, ev1: &Event, ev2: &Event) -> N64 {
        let mut dist = n64(0.);
        let set_pairs = ev1.outgoing().iter().zip(ev2.outgoing().iter());
        for ((_id1, s1), (_id2, s2)) in set_pairs {
            dist += s1
                .iter()
                .zip(s2.iter())
                .map(|(p1, p2)| {
                    self.e_fact * (p1[0] - p2[0]).abs()
                        + (p1[1] - p2[1]).abs()
                })
                .sum::<N64>();
        }
        dist
    }
}

const JET: ParticleID = ParticleID::new(81);

fn main() -> Result<()> {
    env_logger::init();

    let mut resampler = ResamplerBuilder::default()
        .distance(MyDistance { e_fact: n64(0.5) })
        .neighbour_search(Search::BruteForce)
        .build();

    for n in 0..10 {
        let x = n as f64;
        let weight = if n % 2 == 0 { 1. } else { -0.5 };
        let mut event = EventBuilder::new();
        event.add_weight(n64(weight));
        event.add_outgoing(JET, [100. + x, x, 50., 0.].into());
        event.add_outgoing(JET, [100., -x, -50., 0.].into());
        resampler.push_event(event.build())?;
    }

    resampler.resample(None, n64(5.))?;

    while let Some(weights) = resampler.next_weights() {
        println!("resampled event weights: {weights:?}");
    }
    Ok(())
}
