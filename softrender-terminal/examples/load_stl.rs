/// Example: Load and render an STL file in the terminal
///
/// Usage: cargo run --example load_stl -- path/to/file.stl [background-dir]
///
/// With a background directory, its images are shown behind the mesh in
/// file-name order, one every couple of seconds.
use image::Rgb;
use softrender_core::{stl, FileImageSource, Mesh};
use softrender_terminal::TerminalApp;
use std::env;
use std::fs;
use std::io;

const MESH_COLOR: Rgb<u8> = Rgb([220, 180, 90]);

fn main() -> io::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let mesh = match args.get(1) {
        Some(stl_path) => {
            let data = fs::read(stl_path).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("Failed to read STL file: {}", e),
                )
            })?;
            let mesh = stl::parse_stl(&data, MESH_COLOR).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Failed to parse STL: {}", e),
                )
            })?;
            println!("Loaded {} triangles from {}", mesh.faces().len(), stl_path);
            mesh
        }
        None => {
            eprintln!("Usage: {} <stl-file> [background-dir]", args[0]);
            eprintln!("\nNo STL file provided, using default cube...");
            Mesh::cube(2.0, MESH_COLOR)
        }
    };

    let mut app = TerminalApp::new(mesh)?;
    if let Some(dir) = args.get(2) {
        let source = FileImageSource::from_directory(dir)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
        println!("Found {} background images", source.len());
        app = app.with_backgrounds(source);
    }

    std::thread::sleep(std::time::Duration::from_secs(1));
    app.run()?;

    println!("Thank you for using the softrender terminal renderer!");
    Ok(())
}
