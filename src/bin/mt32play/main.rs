//! mt32play - plays a short phrase through the synth on the default output device
//!
//! Run with: cargo run --bin mt32play

mod app;
mod phrase;

use app::Player;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    Player::new().tempo_ms(180).repeats(2).run()
}
