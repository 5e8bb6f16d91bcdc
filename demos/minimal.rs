// minimal example for streaming cell resampling
// run with `cargo run --release --example minimal`
// set the environment variable `RUST_LOG=info` for command-line output
//
// resamples the canonical two-event dijet sample: one event with
// weight -1 and one with weight +1, merged into a single cell
use anyhow::Result;
use noisy_float::prelude::Float;

use recell::prelude::*;

// outgoing jets, given as [E, px, py, pz]
const EVENTS: [(f64, [[f64; 4]; 2]); 2] = [
    (
        -1.,
        [
            [
                0.86042412975E+02,
                0.18299527188E+02,
                0.50776693328E+02,
                -0.67008593105E+02,
            ],
            [
                0.80026513931E+03,
                -0.18299527188E+02,
                -0.50776693328E+02,
                -0.79844295220E+03,
            ],
        ],
    ),
    (
        1.,
        [
            [
                0.49452408437E+02,
                0.20789583719E+02,
                -0.23718791628E+02,
                0.38088749425E+02,
            ],
            [
                0.10452662667E+03,
                -0.20789583719E+02,
                0.23718791628E+02,
                0.99654542370E+02,
            ],
        ],
    ),
];

const JET: ParticleID = ParticleID::new(81);

fn main() -> Result<()> {
    // initialise logging from the RUST_LOG environment variable
    env_logger::init();

    // resample with default settings: vantage point tree search,
    // no transverse momentum weighting
    let mut resampler = ResamplerBuilder::default().build();

    resampler.reserve(EVENTS.len());
    for (weight, jets) in EVENTS {
        let mut event = EventBuilder::new();
        event.add_weight(n64(weight));
        for p in jets {
            event.add_outgoing(JET, p.into());
        }
        resampler.push_event(event.build())?;
    }

    // merge everything into one cell
    resampler.resample(None, N64::infinity())?;

    // both weights come out as the cell mean, i.e. zero
    while let Some(weights) = resampler.next_weights() {
        println!("resampled event weights: {weights:?}");
    }
    Ok(())
}
