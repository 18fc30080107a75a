use crate::core::io::traits::MeshFile;
use crate::core::mesh::{MeshError, MeshState, MeshTopology};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Header comments and the optional per-vertex density read from an OBJ file.
///
/// Densities travel in `vd <value>` records, one per vertex in vertex order;
/// ordinary OBJ readers ignore them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMetadata {
    pub comments: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ObjParseErrorKind },
    #[error("Invalid mesh: {0}")]
    Mesh(#[from] MeshError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ObjParseErrorKind {
    #[error("Invalid number '{value}'")]
    InvalidNumber { value: String },
    #[error("Expected {expected} values, found {found}")]
    WrongArity { expected: usize, found: usize },
    #[error("Face has {found} vertices; only triangles are supported")]
    NotATriangle { found: usize },
    #[error("Face refers to vertex {index}, which is not defined")]
    UnknownVertex { index: i64 },
    #[error("Found {found} density records for {expected} vertices")]
    DensityCount { expected: usize, found: usize },
}

pub struct ObjFile;

fn parse_f64(token: &str, line: usize) -> Result<f64, ObjError> {
    token.parse().map_err(|_| ObjError::Parse {
        line,
        kind: ObjParseErrorKind::InvalidNumber {
            value: token.to_string(),
        },
    })
}

fn parse_vertex_ref(token: &str, vertex_count: usize, line: usize) -> Result<usize, ObjError> {
    let head = token.split('/').next().unwrap_or(token);
    let index: i64 = head.parse().map_err(|_| ObjError::Parse {
        line,
        kind: ObjParseErrorKind::InvalidNumber {
            value: token.to_string(),
        },
    })?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => vertex_count as i64 + i,
        _ => -1,
    };
    if resolved < 0 || resolved as usize >= vertex_count {
        return Err(ObjError::Parse {
            line,
            kind: ObjParseErrorKind::UnknownVertex { index },
        });
    }
    Ok(resolved as usize)
}

impl MeshFile for ObjFile {
    type Metadata = ObjMetadata;
    type Error = ObjError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MeshTopology, MeshState, Self::Metadata), Self::Error> {
        let mut metadata = ObjMetadata::default();
        let mut positions = Vec::new();
        let mut densities = Vec::new();
        let mut faces = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();

            if let Some(comment) = trimmed.strip_prefix('#') {
                metadata.comments.push(comment.trim().to_string());
                continue;
            }

            let mut tokens = trimmed.split_whitespace();
            let Some(record) = tokens.next() else {
                continue;
            };
            let values: Vec<&str> = tokens.collect();

            match record {
                "v" => {
                    if values.len() < 3 {
                        return Err(ObjError::Parse {
                            line: line_num,
                            kind: ObjParseErrorKind::WrongArity {
                                expected: 3,
                                found: values.len(),
                            },
                        });
                    }
                    positions.push(Point3::new(
                        parse_f64(values[0], line_num)?,
                        parse_f64(values[1], line_num)?,
                        parse_f64(values[2], line_num)?,
                    ));
                }
                "vd" => {
                    if values.len() != 1 {
                        return Err(ObjError::Parse {
                            line: line_num,
                            kind: ObjParseErrorKind::WrongArity {
                                expected: 1,
                                found: values.len(),
                            },
                        });
                    }
                    densities.push(parse_f64(values[0], line_num)?);
                }
                "f" => {
                    if values.len() != 3 {
                        return Err(ObjError::Parse {
                            line: line_num,
                            kind: ObjParseErrorKind::NotATriangle {
                                found: values.len(),
                            },
                        });
                    }
                    let n = positions.len();
                    faces.push([
                        parse_vertex_ref(values[0], n, line_num)?,
                        parse_vertex_ref(values[1], n, line_num)?,
                        parse_vertex_ref(values[2], n, line_num)?,
                    ]);
                }
                _ => {}
            }
        }

        if !densities.is_empty() && densities.len() != positions.len() {
            return Err(ObjError::Parse {
                line: 0,
                kind: ObjParseErrorKind::DensityCount {
                    expected: positions.len(),
                    found: densities.len(),
                },
            });
        }

        let topology = MeshTopology::new(positions.len(), faces)?;
        let mut state = MeshState::new(positions);
        if !densities.is_empty() {
            state = state.with_protein_density(densities)?;
        }
        Ok((topology, state, metadata))
    }

    fn write_to(
        topology: &MeshTopology,
        state: &MeshState,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for comment in &metadata.comments {
            writeln!(writer, "# {}", comment)?;
        }
        for p in state.positions() {
            writeln!(writer, "v {:.12} {:.12} {:.12}", p.x, p.y, p.z)?;
        }
        if state.protein_density().iter().any(|&phi| phi != 0.0) {
            for phi in state.protein_density() {
                writeln!(writer, "vd {:.12}", phi)?;
            }
        }
        for face in topology.faces() {
            writeln!(writer, "f {} {} {}", face[0] + 1, face[1] + 1, face[2] + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::factory::icosphere;
    use std::io::{BufReader, Cursor};

    const TETRAHEDRON: &str = "\
# unit tetrahedron
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
vn 0 0 1
f 1 3 2
f 1/1/1 2/2/1 4/3/1
f 2 3 4
f -4 -1 -2
";

    #[test]
    fn reads_triangles_with_texture_and_relative_indices() {
        let mut reader = BufReader::new(Cursor::new(TETRAHEDRON));
        let (topology, state, metadata) = ObjFile::read_from(&mut reader).unwrap();
        assert_eq!(state.vertex_count(), 4);
        assert_eq!(topology.faces()[3], [0, 3, 2]);
        assert!(topology.is_closed());
        assert_eq!(metadata.comments, vec!["unit tetrahedron".to_string()]);
    }

    #[test]
    fn rejects_quads() {
        let mut reader = BufReader::new(Cursor::new("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n"));
        let err = ObjFile::read_from(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            ObjError::Parse {
                line: 5,
                kind: ObjParseErrorKind::NotATriangle { found: 4 }
            }
        ));
    }

    #[test]
    fn rejects_undefined_vertices() {
        let mut reader = BufReader::new(Cursor::new("v 0 0 0\nv 1 0 0\nf 1 2 3\n"));
        let err = ObjFile::read_from(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            ObjError::Parse {
                kind: ObjParseErrorKind::UnknownVertex { index: 3 },
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut reader = BufReader::new(Cursor::new("v 0 zero 0\n"));
        assert!(matches!(
            ObjFile::read_from(&mut reader).unwrap_err(),
            ObjError::Parse { line: 1, .. }
        ));
    }

    #[test]
    fn file_round_trip_keeps_mesh_and_density() {
        let (topology, state) = icosphere(1.5, 1).unwrap();
        let state = state.with_uniform_protein_density(0.25);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sphere.obj");
        let metadata = ObjMetadata {
            comments: vec!["level 1".to_string()],
        };
        ObjFile::write_to_path(&topology, &state, &metadata, &path).unwrap();

        let (read_topology, read_state, read_metadata) = ObjFile::read_from_path(&path).unwrap();
        assert_eq!(read_topology.faces(), topology.faces());
        assert_eq!(read_metadata, metadata);
        assert!(read_state.protein_density().iter().all(|&phi| phi == 0.25));
        for (a, b) in read_state.positions().iter().zip(state.positions()) {
            assert!((a - b).norm() < 1e-10);
        }
    }
}
