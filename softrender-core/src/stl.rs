/// STL loading (binary and ASCII) into indexed meshes
use std::collections::HashMap;

use image::Rgb;
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::map,
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};
use thiserror::Error;

use crate::error::RenderError;
use crate::mesh::{Face, Mesh, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

#[derive(Debug, Error)]
pub enum StlError {
    #[error("file too small to be a valid STL ({0} bytes)")]
    TooShort(usize),

    #[error("binary STL declares {declared} triangles but holds {available}")]
    Truncated { declared: usize, available: usize },

    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),

    #[error(transparent)]
    Mesh(#[from] RenderError),
}

/// Collects triangles, welding corners with bit-identical positions.
struct MeshBuilder {
    color: Rgb<u8>,
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    lookup: HashMap<[u32; 3], usize>,
}

impl MeshBuilder {
    fn new(color: Rgb<u8>, triangles: usize) -> Self {
        Self {
            color,
            vertices: Vec::with_capacity(triangles),
            faces: Vec::with_capacity(triangles),
            lookup: HashMap::with_capacity(triangles),
        }
    }

    fn index_of(&mut self, [x, y, z]: [f32; 3]) -> usize {
        let key = [x.to_bits(), y.to_bits(), z.to_bits()];
        let vertices = &mut self.vertices;
        let color = self.color;
        *self.lookup.entry(key).or_insert_with(|| {
            vertices.push(Vertex::from_xyz(x, y, z, color));
            vertices.len() - 1
        })
    }

    fn push_triangle(&mut self, corners: [[f32; 3]; 3]) {
        let face = corners.map(|corner| self.index_of(corner));
        self.faces.push(face);
    }

    fn build(self) -> Result<Mesh, StlError> {
        log::info!(
            "loaded STL mesh: {} faces, {} unique vertices",
            self.faces.len(),
            self.vertices.len()
        );
        Ok(Mesh::new(self.vertices, self.faces)?)
    }
}

fn le_vector3(input: &[u8]) -> IResult<&[u8], [f32; 3]> {
    map(tuple((le_f32, le_f32, le_f32)), |(x, y, z)| [x, y, z])(input)
}

/// Normal (ignored), three corners, attribute byte count (ignored).
fn binary_facet(input: &[u8]) -> IResult<&[u8], [[f32; 3]; 3]> {
    let (input, _normal) = le_vector3(input)?;
    let (input, a) = le_vector3(input)?;
    let (input, b) = le_vector3(input)?;
    let (input, c) = le_vector3(input)?;
    let (input, _attributes) = le_u16(input)?;
    Ok((input, [a, b, c]))
}

/// Parse a binary STL file; every vertex gets `color`.
pub fn parse_binary_stl(data: &[u8], color: Rgb<u8>) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooShort(data.len()));
    }
    let body = &data[HEADER_LEN..];
    let (facets, declared) =
        le_u32::<_, nom::error::Error<&[u8]>>(body).map_err(|_| StlError::TooShort(data.len()))?;
    let declared = declared as usize;
    let available = facets.len() / FACET_LEN;
    if available < declared {
        return Err(StlError::Truncated { declared, available });
    }

    let (_, triangles) = count(binary_facet, declared)(facets)
        .map_err(|_: nom::Err<nom::error::Error<&[u8]>>| StlError::Truncated { declared, available })?;
    let mut builder = MeshBuilder::new(color, declared);
    for corners in triangles {
        builder.push_triangle(corners);
    }
    builder.build()
}

/// Parse an ASCII STL file; every vertex gets `color`.
pub fn parse_ascii_stl(input: &str, color: Rgb<u8>) -> Result<Mesh, StlError> {
    let (_, triangles) = ascii_solid(input).map_err(|e| StlError::Ascii(e.to_string()))?;
    let mut builder = MeshBuilder::new(color, triangles.len());
    for corners in triangles {
        builder.push_triangle(corners);
    }
    builder.build()
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<[[f32; 3]; 3]>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, triangles) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, triangles))
}

fn ascii_facet(input: &str) -> IResult<&str, [[f32; 3]; 3]> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, _normal) = ascii_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, [a, b, c]))
}

fn ascii_vertex(input: &str) -> IResult<&str, [f32; 3]> {
    preceded(preceded(multispace0, tag("vertex")), ascii_vector3)(input)
}

fn ascii_vector3(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, [x, y, z]))
}

/// Detect and parse STL file (binary or ASCII).
///
/// Binary files may also start with `solid`, so ASCII is only trusted when
/// it parses; anything else falls back to binary.
pub fn parse_stl(data: &[u8], color: Rgb<u8>) -> Result<Mesh, StlError> {
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            match parse_ascii_stl(text, color) {
                Ok(mesh) => return Ok(mesh),
                Err(e) => log::debug!("not an ASCII STL ({}), trying binary", e),
            }
        }
    }
    parse_binary_stl(data, color)
}
