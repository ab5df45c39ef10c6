use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use crate::colmap::camera::Camera;
use crate::colmap::image::Image;
use crate::colmap::parse::{CamerasParser, ImagesParser, Parseable, PointsParser};
use crate::colmap::point::Point3D;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InputType {
    Points3D = 0,
    Images = 1,
    Cameras = 2,
}

impl InputType {
    pub fn file_stem(&self) -> &'static str {
        match self {
            InputType::Points3D => "points3D",
            InputType::Images => "images",
            InputType::Cameras => "cameras",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InputFormat {
    Binary = 0,
    Text = 1,
}

impl InputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            InputFormat::Binary => "bin",
            InputFormat::Text => "txt",
        }
    }
}

#[derive(Debug)]
pub enum InputData {
    Images(BTreeMap<i32, Image>),
    Points3D(HashMap<i64, Point3D>),
    Cameras(HashMap<i32, Camera>),
}

impl InputData {
    pub fn as_images(self) -> Option<BTreeMap<i32, Image>> {
        if let InputData::Images(map) = self {
            Some(map)
        } else {
            None
        }
    }

    pub fn as_points(self) -> Option<HashMap<i64, Point3D>> {
        if let InputData::Points3D(map) = self {
            Some(map)
        } else {
            None
        }
    }

    pub fn as_cameras(self) -> Option<HashMap<i32, Camera>> {
        if let InputData::Cameras(map) = self {
            Some(map)
        } else {
            None
        }
    }
}

pub struct InputFile {
    parser: Box<dyn Parseable>,
    input_format: InputFormat,
    path: PathBuf,
}

impl InputFile {
    pub fn new(path: PathBuf, input_type: InputType, input_format: InputFormat) -> InputFile {
        let parser: Box<dyn Parseable> = match input_type {
            InputType::Cameras => Box::new(CamerasParser),
            InputType::Images => Box::new(ImagesParser),
            InputType::Points3D => Box::new(PointsParser),
        };

        Self {
            path,
            input_format,
            parser,
        }
    }

    pub async fn parse(&self) -> io::Result<InputData> {
        let file = tokio::fs::File::open(&self.path).await?;
        let reader = tokio::io::BufReader::new(file);
        match &self.input_format {
            InputFormat::Binary => self.parser.parse_bin(reader).await,
            InputFormat::Text => self.parser.parse_txt(reader).await,
        }
    }
}
