//! Binary dump (ssf, §6): a versioned header (magic, version, run-type tag,
//! particle count, a quantity descriptor table) followed by per-quantity
//! buffers in descriptor order, value then dt then d2t as the order calls
//! for. Every floating value is little-endian IEEE-754 double; every
//! integer is 32-bit little-endian. Loads are atomic: a truncated or
//! malformed file never partially overwrites the caller's store.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{IoError, IoResult};
use crate::quantity::value::{SymmetricTensor, TracelessTensor, Vector};
use crate::quantity::{Buffer, Column, Order, QuantityId, Storage, ValueType};

use super::RunType;

const MAGIC: u32 = 0x0046_5353;
const VERSION: u32 = 1;

pub fn dump(path: &Path, store: &Storage, run_type: RunType) -> IoResult<()> {
    let mut file = std::fs::File::create(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    write_to(&mut file, store, run_type).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load(path: &Path) -> IoResult<(Storage, RunType)> {
    let mut file = std::fs::File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_from(&mut file, path)
}

fn write_to(w: &mut impl Write, store: &Storage, run_type: RunType) -> std::io::Result<()> {
    let ids: Vec<QuantityId> = store.quantity_ids().collect();
    w.write_all(&MAGIC.to_le_bytes())?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&run_type.tag().to_le_bytes())?;
    w.write_all(&(store.particle_count() as u32).to_le_bytes())?;
    w.write_all(&(ids.len() as u32).to_le_bytes())?;
    for &id in &ids {
        let column = store.column(id).expect("id came from quantity_ids");
        w.write_all(&id.tag().to_le_bytes())?;
        w.write_all(&column.value_type().tag().to_le_bytes())?;
        w.write_all(&column.order().order_tag().to_le_bytes())?;
    }
    for &id in &ids {
        let column = store.column(id).expect("id came from quantity_ids");
        write_column(w, column)?;
    }
    Ok(())
}

fn read_from(r: &mut impl Read, path: &Path) -> IoResult<(Storage, RunType)> {
    let magic = read_u32(r, path)?;
    if magic != MAGIC {
        return Err(IoError::BadMagic {
            path: path.to_path_buf(),
            expected: MAGIC,
            found: magic,
        });
    }
    let version = read_u32(r, path)?;
    if version > VERSION {
        return Err(IoError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: version,
            max: VERSION,
        });
    }
    let run_type = RunType::from_tag(read_u32(r, path)?).unwrap_or(RunType::Sph);
    let particle_count = read_u32(r, path)? as usize;
    let quantity_count = read_u32(r, path)?;

    struct Descriptor {
        id: QuantityId,
        value_type: ValueType,
        order: Order,
    }
    let mut descriptors = Vec::with_capacity(quantity_count as usize);
    for _ in 0..quantity_count {
        let id_tag = read_u32(r, path)?;
        let type_tag = read_u32(r, path)?;
        let order_tag = read_u32(r, path)?;
        let id = QuantityId::from_tag(id_tag).ok_or(IoError::MalformedConfig {
            path: path.to_path_buf(),
            line: 0,
            message: format!("unknown quantity tag {id_tag}"),
        })?;
        let value_type = ValueType::from_tag(type_tag).ok_or(IoError::UnsupportedValueType {
            path: path.to_path_buf(),
            value_type: ValueType::Float,
        })?;
        let order = Order::from_order_tag(order_tag).ok_or(IoError::MalformedConfig {
            path: path.to_path_buf(),
            line: 0,
            message: format!("invalid order tag {order_tag}"),
        })?;
        descriptors.push(Descriptor { id, value_type, order });
    }

    let mut store = Storage::new();
    for descriptor in &descriptors {
        let column = read_column(r, path, descriptor.id, descriptor.value_type, descriptor.order, particle_count)?;
        store.insert_column(descriptor.id, column).map_err(|_| IoError::TruncatedRecord {
            path: path.to_path_buf(),
            id: descriptor.id,
            expected: particle_count,
            actual: 0,
        })?;
    }
    Ok((store, run_type))
}

fn read_u32(r: &mut impl Read, path: &Path) -> IoResult<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read, path: &Path) -> IoResult<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(|source| IoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(f64::from_le_bytes(buf))
}

fn write_column(w: &mut impl Write, column: &Column) -> std::io::Result<()> {
    match column {
        Column::Float(b) => write_buffer(w, b, |w, v| w.write_all(&v.to_le_bytes())),
        Column::Vector(b) => write_buffer(w, b, |w, v| {
            w.write_all(&v.xyz.x.to_le_bytes())?;
            w.write_all(&v.xyz.y.to_le_bytes())?;
            w.write_all(&v.xyz.z.to_le_bytes())?;
            w.write_all(&v.h.to_le_bytes())
        }),
        Column::SymmetricTensor(b) => write_buffer(w, b, |w, v| {
            w.write_all(&v.diag.x.to_le_bytes())?;
            w.write_all(&v.diag.y.to_le_bytes())?;
            w.write_all(&v.diag.z.to_le_bytes())?;
            w.write_all(&v.off.x.to_le_bytes())?;
            w.write_all(&v.off.y.to_le_bytes())?;
            w.write_all(&v.off.z.to_le_bytes())
        }),
        Column::TracelessTensor(b) => write_buffer(w, b, |w, v| {
            w.write_all(&v.xx.to_le_bytes())?;
            w.write_all(&v.yy.to_le_bytes())?;
            w.write_all(&v.xy.to_le_bytes())?;
            w.write_all(&v.xz.to_le_bytes())?;
            w.write_all(&v.yz.to_le_bytes())
        }),
        Column::Size(b) => write_buffer(w, b, |w, v| w.write_all(&(*v as u32).to_le_bytes())),
    }
}

fn write_buffer<T: Clone, F: Fn(&mut dyn Write, &T) -> std::io::Result<()>>(
    w: &mut impl Write,
    buffer: &Buffer<T>,
    write_one: F,
) -> std::io::Result<()> {
    for v in &buffer.value {
        write_one(w, v)?;
    }
    if let Some(dt) = &buffer.dt {
        for v in dt {
            write_one(w, v)?;
        }
    }
    if let Some(d2t) = &buffer.d2t {
        for v in d2t {
            write_one(w, v)?;
        }
    }
    Ok(())
}

fn read_column(
    r: &mut impl Read,
    path: &Path,
    id: QuantityId,
    value_type: ValueType,
    order: Order,
    n: usize,
) -> IoResult<Column> {
    Ok(match value_type {
        ValueType::Float => Column::Float(read_buffer(r, path, id, order, n, |r| read_f64(r, path))?),
        ValueType::Vector => Column::Vector(read_buffer(r, path, id, order, n, |r| {
            Ok(Vector::new(read_f64(r, path)?, read_f64(r, path)?, read_f64(r, path)?, read_f64(r, path)?))
        })?),
        ValueType::SymmetricTensor => Column::SymmetricTensor(read_buffer(r, path, id, order, n, |r| {
            Ok(SymmetricTensor {
                diag: glam::DVec3::new(read_f64(r, path)?, read_f64(r, path)?, read_f64(r, path)?),
                off: glam::DVec3::new(read_f64(r, path)?, read_f64(r, path)?, read_f64(r, path)?),
            })
        })?),
        ValueType::TracelessTensor => Column::TracelessTensor(read_buffer(r, path, id, order, n, |r| {
            Ok(TracelessTensor {
                xx: read_f64(r, path)?,
                yy: read_f64(r, path)?,
                xy: read_f64(r, path)?,
                xz: read_f64(r, path)?,
                yz: read_f64(r, path)?,
            })
        })?),
        ValueType::Size => Column::Size(read_buffer(r, path, id, order, n, |r| Ok(read_u32(r, path)? as u64))?),
    })
}

fn read_buffer<T: Clone + Default, F: FnMut(&mut dyn Read) -> IoResult<T>>(
    r: &mut impl Read,
    _path: &Path,
    _id: QuantityId,
    order: Order,
    n: usize,
    mut read_one: F,
) -> IoResult<Buffer<T>> {
    let mut read_n = |r: &mut dyn Read| -> IoResult<Vec<T>> {
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(read_one(r)?);
        }
        Ok(values)
    };
    let value = read_n(r)?;
    let dt = if order.buffer_count() >= 2 { Some(read_n(r)?) } else { None };
    let d2t = if order.buffer_count() >= 3 { Some(read_n(r)?) } else { None };
    Ok(Buffer { order, value, dt, d2t })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::QuantityId;
    use std::io::Cursor;

    fn sample_store() -> Storage {
        let mut store = Storage::new();
        store
            .insert(QuantityId::Position, Order::Second, vec![Vector::new(1.0, 2.0, 3.0, 0.1), Vector::new(-1.0, 0.0, 2.0, 0.2)])
            .unwrap();
        store.insert(QuantityId::Mass, Order::Zero, vec![1.5, 2.5]).unwrap();
        store
    }

    #[test]
    fn round_trip_through_an_in_memory_buffer() {
        let store = sample_store();
        let mut buf = Vec::new();
        write_to(&mut buf, &store, RunType::Sph).unwrap();
        let (loaded, run_type) = read_from(&mut Cursor::new(buf), Path::new("<mem>")).unwrap();
        assert_eq!(run_type, RunType::Sph);
        assert_eq!(loaded.particle_count(), 2);
        assert_eq!(
            loaded.get_value::<Vector>(QuantityId::Position).unwrap(),
            store.get_value::<Vector>(QuantityId::Position).unwrap()
        );
        assert_eq!(loaded.get_value::<f64>(QuantityId::Mass).unwrap(), store.get_value::<f64>(QuantityId::Mass).unwrap());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = vec![0u8; 32];
        let err = read_from(&mut Cursor::new(&mut buf), Path::new("<mem>")).unwrap_err();
        assert!(matches!(err, IoError::BadMagic { .. }));
    }
}
