//! Compressed dump (scf, §6): a lossy, position/velocity/H-only variant of
//! the ssf format, single precision. No descriptor table — the schema is
//! fixed, so a reader always knows what it's getting.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{IoError, IoResult};
use crate::quantity::value::Vector;
use crate::quantity::{Order, QuantityId, Storage};

const MAGIC: u32 = 0x0046_4353;

pub fn dump(path: &Path, store: &Storage) -> IoResult<()> {
    let mut file = std::fs::File::create(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    write_to(&mut file, store).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load(path: &Path) -> IoResult<Storage> {
    let mut file = std::fs::File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_from(&mut file, path)
}

fn write_to(w: &mut impl Write, store: &Storage) -> std::io::Result<()> {
    let positions = store
        .get_value::<Vector>(QuantityId::Position)
        .expect("scf dump requires Position");
    let velocities = store
        .get_dt::<Vector>(QuantityId::Position)
        .expect("scf dump requires a velocity buffer");

    w.write_all(&MAGIC.to_le_bytes())?;
    w.write_all(&(positions.len() as u32).to_le_bytes())?;
    for (p, v) in positions.iter().zip(velocities) {
        for component in [p.xyz.x, p.xyz.y, p.xyz.z, v.xyz.x, v.xyz.y, v.xyz.z, p.h] {
            w.write_all(&(component as f32).to_le_bytes())?;
        }
    }
    Ok(())
}

fn read_from(r: &mut impl Read, path: &Path) -> IoResult<Storage> {
    let magic = read_u32(r, path)?;
    if magic != MAGIC {
        return Err(IoError::BadMagic {
            path: path.to_path_buf(),
            expected: MAGIC,
            found: magic,
        });
    }
    let n = read_u32(r, path)? as usize;
    let mut positions = Vec::with_capacity(n);
    let mut velocities = Vec::with_capacity(n);
    for _ in 0..n {
        let x = read_f32(r, path)?;
        let y = read_f32(r, path)?;
        let z = read_f32(r, path)?;
        let vx = read_f32(r, path)?;
        let vy = read_f32(r, path)?;
        let vz = read_f32(r, path)?;
        let h = read_f32(r, path)?;
        positions.push(Vector::new(x, y, z, h));
        velocities.push(Vector::new(vx, vy, vz, 0.0));
    }
    let mut store = Storage::new();
    store
        .insert(QuantityId::Position, Order::Second, positions)
        .map_err(|_| IoError::TruncatedRecord {
            path: path.to_path_buf(),
            id: QuantityId::Position,
            expected: n,
            actual: 0,
        })?;
    store
        .get_dt_mut::<Vector>(QuantityId::Position)
        .expect("just inserted as Order::Second")
        .clone_from_slice(&velocities);
    Ok(store)
}

fn read_u32(r: &mut impl Read, path: &Path) -> IoResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32(r: &mut impl Read, path: &Path) -> IoResult<f64> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(f32::from_le_bytes(buf) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_preserves_position_velocity_and_h_to_float32_precision() {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Position, Order::Second, vec![Vector::new(1.0, 2.0, 3.0, 0.25)])
            .unwrap();
        store.get_dt_mut::<Vector>(QuantityId::Position).unwrap()[0] = Vector::new(0.5, -0.5, 0.0, 0.0);

        let mut buf = Vec::new();
        write_to(&mut buf, &store).unwrap();
        let loaded = read_from(&mut Cursor::new(buf), Path::new("<mem>")).unwrap();

        let p = &loaded.get_value::<Vector>(QuantityId::Position).unwrap()[0];
        assert!((p.xyz.x - 1.0).abs() < 1e-6);
        assert!((p.h - 0.25).abs() < 1e-6);
        let v = &loaded.get_dt::<Vector>(QuantityId::Position).unwrap()[0];
        assert!((v.xyz.x - 0.5).abs() < 1e-6);
    }
}
