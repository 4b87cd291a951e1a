//! Mesh export formats (§6): ASCII PLY, the plain "Tab" format, and OBJ.
//! Triangle meshes only, vertices as `(x, y, z)`, faces as index triples.
//! Write-only — mesh import isn't part of this crate's contract.

use std::io::Write;
use std::path::Path;

use glam::DVec3;

use crate::error::{IoError, IoResult};

pub struct Mesh {
    pub vertices: Vec<DVec3>,
    pub faces: Vec<[usize; 3]>,
}

pub fn write_ply(path: &Path, mesh: &Mesh) -> IoResult<()> {
    let mut file = create(path)?;
    write_ply_to(&mut file, mesh).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_tab(path: &Path, mesh: &Mesh) -> IoResult<()> {
    let mut file = create(path)?;
    write_tab_to(&mut file, mesh).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_obj(path: &Path, mesh: &Mesh) -> IoResult<()> {
    let mut file = create(path)?;
    write_obj_to(&mut file, mesh).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> IoResult<std::fs::File> {
    std::fs::File::create(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn write_ply_to(w: &mut impl Write, mesh: &Mesh) -> std::io::Result<()> {
    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "element vertex {}", mesh.vertices.len())?;
    writeln!(w, "property float x")?;
    writeln!(w, "property float y")?;
    writeln!(w, "property float z")?;
    writeln!(w, "element face {}", mesh.faces.len())?;
    writeln!(w, "property list int int vertex_index")?;
    writeln!(w, "end_header")?;
    for v in &mesh.vertices {
        writeln!(w, "{} {} {}", v.x, v.y, v.z)?;
    }
    for f in &mesh.faces {
        writeln!(w, "3 {} {} {}", f[0], f[1], f[2])?;
    }
    Ok(())
}

fn write_tab_to(w: &mut impl Write, mesh: &Mesh) -> std::io::Result<()> {
    writeln!(w, "{} {}", mesh.vertices.len(), mesh.faces.len())?;
    for v in &mesh.vertices {
        writeln!(w, "{} {} {}", v.x, v.y, v.z)?;
    }
    for f in &mesh.faces {
        writeln!(w, "{} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    Ok(())
}

fn write_obj_to(w: &mut impl Write, mesh: &Mesh) -> std::io::Result<()> {
    for v in &mesh.vertices {
        writeln!(w, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in &mesh.faces {
        writeln!(w, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh {
            vertices: vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0), DVec3::new(0.0, 1.0, 0.0)],
            faces: vec![[0, 1, 2]],
        }
    }

    #[test]
    fn ply_header_matches_the_fixed_field_layout() {
        let mut buf = Vec::new();
        write_ply_to(&mut buf, &triangle()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("element vertex 3"));
        assert!(text.contains("element face 1"));
        assert!(text.contains("3 0 1 2"));
    }

    #[test]
    fn obj_and_tab_faces_are_one_indexed() {
        let mut obj = Vec::new();
        write_obj_to(&mut obj, &triangle()).unwrap();
        assert!(String::from_utf8(obj).unwrap().contains("f 1 2 3"));

        let mut tab = Vec::new();
        write_tab_to(&mut tab, &triangle()).unwrap();
        let text = String::from_utf8(tab).unwrap();
        assert!(text.starts_with("3 1\n"));
        assert!(text.contains("1 2 3"));
    }
}
