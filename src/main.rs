// This binary crate is intentionally minimal.
// Training, scheduling and evaluation live in the library (src/lib.rs).
// Run the demo with:
//   cargo run --example next_location
fn main() {
    env_logger::init();
    log::info!("ferrite-traj {}", env!("CARGO_PKG_VERSION"));
    println!("ferrite-traj: next-location training and top-k evaluation in Rust.");
    println!("Run `cargo run --example next_location` to train on synthetic trajectories.");
}
