use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use glam::{DQuat, DVec2, DVec3};
use tokio::fs::File;
use tokio::io;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use crate::colmap::camera::{Camera, CameraModel};
use crate::colmap::image::Image;
use crate::colmap::input::InputData;
use crate::colmap::point::Point3D;

pub struct PointsParser;
pub struct ImagesParser;
pub struct CamerasParser;

type ParseResult = Pin<Box<dyn Future<Output = io::Result<InputData>> + Send>>;

pub trait Parseable: Send + Sync {
    fn parse_bin(&self, reader: BufReader<File>) -> ParseResult;
    fn parse_txt(&self, reader: BufReader<File>) -> ParseResult;
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_owned())
}

fn parse<T: std::str::FromStr>(s: &str) -> io::Result<T> {
    s.parse()
        .map_err(|_e| invalid(&format!("Parse error: {s}")))
}

/// Upper bound on what a length read from a binary file may preallocate.
const MAX_PREALLOC: u64 = 1 << 16;

fn capacity(len: u64) -> usize {
    len.min(MAX_PREALLOC) as usize
}

/// Reads the next non-empty, non-comment line into `line`. False at end of file.
async fn next_record(reader: &mut BufReader<File>, line: &mut String) -> io::Result<bool> {
    loop {
        line.clear();
        if reader.read_line(line).await? == 0 {
            return Ok(false);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            return Ok(true);
        }
    }
}

impl Parseable for ImagesParser {
    fn parse_bin(&self, mut reader: BufReader<File>) -> ParseResult {
        Box::pin(async move {
            let mut images = BTreeMap::new();
            let num_images = reader.read_u64_le().await?;

            for _ in 0..num_images {
                let image_id = reader.read_i32_le().await?;

                let [w, x, y, z] = [
                    reader.read_f64_le().await?,
                    reader.read_f64_le().await?,
                    reader.read_f64_le().await?,
                    reader.read_f64_le().await?,
                ];
                let quat = DQuat::from_xyzw(x, y, z, w);

                let tvec = DVec3::new(
                    reader.read_f64_le().await?,
                    reader.read_f64_le().await?,
                    reader.read_f64_le().await?,
                );

                let camera_id = reader.read_i32_le().await?;
                let mut name_bytes = Vec::new();
                reader.read_until(b'\0', &mut name_bytes).await?;
                if name_bytes.pop() != Some(b'\0') {
                    return Err(invalid("Unterminated image name"));
                }

                let name = String::from_utf8(name_bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

                let num_points2d = reader.read_u64_le().await?;
                let mut xys = Vec::with_capacity(capacity(num_points2d));
                let mut point3d_ids = Vec::with_capacity(capacity(num_points2d));

                for _ in 0..num_points2d {
                    xys.push(DVec2::new(
                        reader.read_f64_le().await?,
                        reader.read_f64_le().await?,
                    ));
                    point3d_ids.push(reader.read_i64_le().await?);
                }

                images.insert(
                    image_id,
                    Image {
                        quat,
                        tvec,
                        camera_id,
                        name,
                        xys,
                        point3d_ids,
                    },
                );
            }

            Ok(InputData::Images(images))
        })
    }

    fn parse_txt(&self, mut reader: BufReader<File>) -> ParseResult {
        Box::pin(async move {
            let mut images = BTreeMap::new();
            let mut line = String::new();

            while next_record(&mut reader, &mut line).await? {
                let elems: Vec<&str> = line.split_whitespace().collect();
                if elems.len() < 10 {
                    return Err(invalid("Invalid image data"));
                }
                let id: i32 = parse(elems[0])?;

                let [w, x, y, z] = [
                    parse(elems[1])?,
                    parse(elems[2])?,
                    parse(elems[3])?,
                    parse(elems[4])?,
                ];
                let quat = DQuat::from_xyzw(x, y, z, w);
                let tvec = DVec3::new(parse(elems[5])?, parse(elems[6])?, parse(elems[7])?);
                let camera_id: i32 = parse(elems[8])?;
                let name = elems[9].to_owned();

                // The observations line may be empty, so it is read raw.
                line.clear();
                reader.read_line(&mut line).await?;
                let elems: Vec<&str> = line.split_whitespace().collect();
                let mut xys = Vec::new();
                let mut point3d_ids = Vec::new();

                for chunk in elems.chunks(3) {
                    if chunk.len() < 3 {
                        return Err(invalid("Invalid image observation data"));
                    }
                    xys.push(DVec2::new(parse(chunk[0])?, parse(chunk[1])?));
                    point3d_ids.push(parse(chunk[2])?);
                }

                images.insert(
                    id,
                    Image {
                        quat,
                        tvec,
                        camera_id,
                        name,
                        xys,
                        point3d_ids,
                    },
                );
            }

            Ok(InputData::Images(images))
        })
    }
}

impl Parseable for PointsParser {
    fn parse_bin(&self, mut reader: BufReader<File>) -> ParseResult {
        Box::pin(async move {
            let mut points3d = HashMap::new();
            let num_points = reader.read_u64_le().await?;

            for _ in 0..num_points {
                let point3d_id = reader.read_i64_le().await?;
                let xyz = DVec3::new(
                    reader.read_f64_le().await?,
                    reader.read_f64_le().await?,
                    reader.read_f64_le().await?,
                );
                let rgb = [
                    reader.read_u8().await?,
                    reader.read_u8().await?,
                    reader.read_u8().await?,
                ];
                let error = reader.read_f64_le().await?;

                let track_length = reader.read_u64_le().await?;
                let mut image_ids = Vec::with_capacity(capacity(track_length));
                let mut point2d_idxs = Vec::with_capacity(capacity(track_length));

                for _ in 0..track_length {
                    image_ids.push(reader.read_i32_le().await?);
                    point2d_idxs.push(reader.read_i32_le().await?);
                }

                points3d.insert(
                    point3d_id,
                    Point3D {
                        xyz,
                        rgb,
                        error,
                        image_ids,
                        point2d_idxs,
                    },
                );
            }

            Ok(InputData::Points3D(points3d))
        })
    }

    fn parse_txt(&self, mut reader: BufReader<File>) -> ParseResult {
        Box::pin(async move {
            let mut points3d = HashMap::new();
            let mut line = String::new();

            while next_record(&mut reader, &mut line).await? {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 8 {
                    return Err(invalid("Invalid point3D data"));
                }

                let id: i64 = parse(parts[0])?;
                let xyz = DVec3::new(parse(parts[1])?, parse(parts[2])?, parse(parts[3])?);
                let rgb = [
                    parse::<u8>(parts[4])?,
                    parse::<u8>(parts[5])?,
                    parse::<u8>(parts[6])?,
                ];
                let error: f64 = parse(parts[7])?;

                let mut image_ids = Vec::new();
                let mut point2d_idxs = Vec::new();

                for chunk in parts[8..].chunks(2) {
                    if chunk.len() < 2 {
                        return Err(invalid("Invalid point3D track data"));
                    }
                    image_ids.push(parse(chunk[0])?);
                    point2d_idxs.push(parse(chunk[1])?);
                }

                points3d.insert(
                    id,
                    Point3D {
                        xyz,
                        rgb,
                        error,
                        image_ids,
                        point2d_idxs,
                    },
                );
            }

            Ok(InputData::Points3D(points3d))
        })
    }
}

impl Parseable for CamerasParser {
    fn parse_bin(&self, mut reader: BufReader<File>) -> ParseResult {
        Box::pin(async move {
            let mut cameras = HashMap::new();
            let num_cameras = reader.read_u64_le().await?;

            for _ in 0..num_cameras {
                let camera_id = reader.read_i32_le().await?;
                let model_id = reader.read_i32_le().await?;
                let width = reader.read_u64_le().await?;
                let height = reader.read_u64_le().await?;

                let model = CameraModel::from_id(model_id)
                    .ok_or_else(|| invalid("Invalid camera model"))?;

                let num_params = model.num_params();
                let mut params = Vec::with_capacity(num_params);
                for _ in 0..num_params {
                    params.push(reader.read_f64_le().await?);
                }

                cameras.insert(
                    camera_id,
                    Camera {
                        id: camera_id,
                        model,
                        width,
                        height,
                        params,
                    },
                );
            }

            Ok(InputData::Cameras(cameras))
        })
    }

    fn parse_txt(&self, mut reader: BufReader<File>) -> ParseResult {
        Box::pin(async move {
            let mut cameras = HashMap::new();
            let mut line = String::new();

            while next_record(&mut reader, &mut line).await? {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 4 {
                    return Err(invalid("Invalid camera data"));
                }

                let id = parse(parts[0])?;
                let model = CameraModel::from_name(parts[1])
                    .ok_or_else(|| invalid("Invalid camera model"))?;

                let width = parse(parts[2])?;
                let height = parse(parts[3])?;
                let params: Vec<f64> = parts[4..]
                    .iter()
                    .map(|&s| parse(s))
                    .collect::<Result<_, _>>()?;

                if params.len() != model.num_params() {
                    return Err(invalid("Invalid number of camera parameters"));
                }

                cameras.insert(
                    id,
                    Camera {
                        id,
                        model,
                        width,
                        height,
                        params,
                    },
                );
            }

            Ok(InputData::Cameras(cameras))
        })
    }
}
