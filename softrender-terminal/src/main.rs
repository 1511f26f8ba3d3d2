/// softrender terminal demo - rotating cube
///
/// Controls:
///   - WASD / Arrow Keys: Rotate the cube
///   - E/R: Roll rotation
///   - P: Toggle perspective/orthographic projection
///   - X: Toggle axes
///   - Q/ESC: Quit
///
/// Set RUST_LOG to see the renderer's log output on stderr.
use image::Rgb;
use softrender_core::Mesh;
use softrender_terminal::TerminalApp;
use std::io;

fn main() -> io::Result<()> {
    env_logger::init();

    let cube = Mesh::cube(2.0, Rgb([90, 170, 230]));
    log::info!(
        "starting terminal renderer with a {}-face cube",
        cube.faces().len()
    );

    let mut app = TerminalApp::new(cube)?;
    app.run()?;

    println!("Thank you for using the softrender terminal renderer!");
    Ok(())
}
