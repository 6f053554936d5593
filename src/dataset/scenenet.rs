// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to handle the SceneNet RGB-D dataset.
//!
//! Each trajectory is rendered in its own directory (its render path)
//! with one `depth/<frame>.png`, `photo/<frame>.jpg` and
//! `instance/<frame>.png` image per view.

use log::debug;
use std::path::{Path, PathBuf};

use crate::core::camera::Intrinsics;
use crate::core::depth::{self, DepthMap};
use crate::core::pose::ShutterInterval;
use crate::error::Result;
use crate::misc::helper;
use crate::misc::type_aliases::{Float, Point3, Vec3};

/// U16 depth values are in millimeters.
/// So 1000 in the 16 bits gray png corresponds to 1 meter.
pub const DEPTH_SCALE: Float = 0.001;

/// Intrinsics parameters of every SceneNet RGB-D render.
pub const INTRINSICS: Intrinsics = Intrinsics {
    horizontal_fov: 60.0,
    vertical_fov: 45.0,
    width: 320,
    height: 240,
};

/// Fraction of the shutter interval at which depth, instance
/// and ground truth images are rendered.
pub const RENDER_ALPHA: Float = 0.5;

/// Only one shutter interval out of `FRAME_SKIP` is rendered.
pub const FRAME_SKIP: usize = 25;

/// Depth of pixels without depth (windows) when computing optical flow: 1km.
pub const FLOW_MISSING_DEPTH: Float = 1000.0;

/// Depth of pixels without depth (windows) when computing surface normals.
pub const NORMALS_MISSING_DEPTH: Float = 50.0;

/// A rendered camera trajectory in a scene.
#[derive(PartialEq, Debug, Clone)]
pub struct Trajectory {
    /// Directory of the renders, relative to the dataset root.
    pub render_path: String,
    /// Objects of the scene. The first one is always the background.
    pub instances: Vec<Instance>,
    /// Rendered views, in frame order.
    pub views: Vec<View>,
}

/// A rendered frame of a trajectory.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct View {
    /// Frame number, used in image file names.
    pub frame_num: usize,
    /// Camera motion while the frame was exposed.
    pub shutter: ShutterInterval,
}

/// An object of the scene, as identified in instance images.
#[derive(PartialEq, Debug, Clone)]
pub struct Instance {
    /// Value of the instance in instance images.
    pub instance_id: u32,
    /// WordNet synset id of the object class.
    pub wordnet_id: String,
    /// Plain english name of the object class.
    pub english: String,
    /// What kind of object this is.
    pub kind: InstanceKind,
}

/// Kinds of scene instances.
#[derive(PartialEq, Debug, Clone)]
pub enum InstanceKind {
    /// Pixels hitting nothing.
    Background,
    /// Part of the room layout model.
    Layout,
    /// ShapeNet object randomly placed in the scene.
    Random {
        /// Hash of the ShapeNet model.
        shapenet_hash: String,
    },
    /// Light emitting object.
    Light(LightInfo),
}

/// Description of a light.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LightInfo {
    /// Center of the light, in world coordinates.
    pub position: Point3,
    /// Emitted RGB power.
    pub power: Vec3,
    /// Geometry of the light.
    pub shape: LightShape,
}

/// Light geometries.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum LightShape {
    /// Spherical light.
    Sphere {
        /// Radius of the sphere.
        radius: Float,
    },
    /// Flat parallelogram light spanned by two vectors.
    Parallelogram {
        /// First side.
        v1: Vec3,
        /// Second side.
        v2: Vec3,
    },
}

impl Instance {
    /// The background instance, always with id 0.
    pub fn background() -> Instance {
        Instance {
            instance_id: 0,
            wordnet_id: String::new(),
            english: String::new(),
            kind: InstanceKind::Background,
        }
    }
}

impl Trajectory {
    /// Find an instance by its id.
    pub fn instance(&self, instance_id: u32) -> Option<&Instance> {
        self.instances
            .iter()
            .find(|inst| inst.instance_id == instance_id)
    }

    /// Lights of the scene, with their instance id.
    pub fn lights(&self) -> impl Iterator<Item = (u32, &LightInfo)> {
        self.instances.iter().filter_map(|inst| match &inst.kind {
            InstanceKind::Light(light) => Some((inst.instance_id, light)),
            _ => None,
        })
    }

    /// Path of the depth image of a view.
    pub fn depth_path<P: AsRef<Path>>(&self, data_root: P, view: &View) -> PathBuf {
        self.image_path(data_root, "depth", view.frame_num, "png")
    }

    /// Path of the photo of a view.
    pub fn photo_path<P: AsRef<Path>>(&self, data_root: P, view: &View) -> PathBuf {
        self.image_path(data_root, "photo", view.frame_num, "jpg")
    }

    /// Path of the instance image of a view.
    pub fn instance_path<P: AsRef<Path>>(&self, data_root: P, view: &View) -> PathBuf {
        self.image_path(data_root, "instance", view.frame_num, "png")
    }

    fn image_path<P: AsRef<Path>>(&self, data_root: P, kind: &str, frame_num: usize, ext: &str) -> PathBuf {
        data_root
            .as_ref()
            .join(&self.render_path)
            .join(kind)
            .join(format!("{}.{}", frame_num, ext))
    }
}

/// Read a depth image and convert it into meters.
/// Missing depths stay at 0.
pub fn read_depth_map<P: AsRef<Path>>(file_path: P) -> Result<DepthMap> {
    let raw = helper::read_matrix_16bits(file_path)?;
    Ok(depth::from_raw_map(DEPTH_SCALE, &raw))
}

/// Read and parse the render log of a trajectory.
pub fn read_trajectory<P: AsRef<Path>>(render_path: &str, log_path: P, frame_skip: usize) -> Result<Trajectory> {
    let content = std::fs::read_to_string(log_path)?;
    let traj = parse::trajectory(render_path, &content, frame_skip)?;
    debug!(
        "trajectory {}: {} instances, {} views",
        traj.render_path,
        traj.instances.len(),
        traj.views.len()
    );
    Ok(traj)
}

/// Parse the render log of a trajectory.
pub mod parse {
    use super::*;
    use crate::core::pose::Pose;
    use crate::error::Error;
    use itertools::Itertools;
    use nom::{
        bytes::complete::tag,
        character::complete::{char, space1},
        combinator::{all_consuming, map},
        multi::separated_list1,
        number::complete::double,
        sequence::{delimited, preceded, terminated, tuple},
        IResult,
    };

    /// Build a trajectory from the content of a render log.
    ///
    /// Pose lines come in pairs (shutter open, shutter close)
    /// and only one pair out of `frame_skip` was rendered.
    pub fn trajectory(render_path: &str, log_content: &str, frame_skip: usize) -> Result<Trajectory> {
        if frame_skip == 0 {
            return Err(Error::InvalidArgument("frame skip must be at least 1".to_string()));
        }
        let mut instances = vec![Instance::background()];
        instances.extend(self::instances(log_content)?);
        let views = poses(log_content)
            .into_iter()
            .tuples::<(Pose, Pose)>()
            .step_by(frame_skip)
            .enumerate()
            .map(|(idx, (open, close))| {
                Ok(View {
                    frame_num: idx * frame_skip,
                    shutter: ShutterInterval::new(open, close)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Trajectory {
            render_path: render_path.to_string(),
            instances,
            views,
        })
    }

    /// Parse every pose of a render log, in order.
    ///
    /// A pose may start anywhere in a line, after any other `time:` text.
    /// Lines without a pose are skipped.
    pub fn poses(log_content: &str) -> Vec<Pose> {
        log_content.lines().filter_map(line_pose).collect()
    }

    // First position of a line where a pose parses.
    fn line_pose(line: &str) -> Option<Pose> {
        line.match_indices("time:")
            .find_map(|(start, _)| pose_line(&line[start..]).ok())
            .map(|(_, pose)| pose)
    }

    /// Parse the instance lines preceding the first pose line.
    pub fn instances(log_content: &str) -> Result<Vec<Instance>> {
        log_content
            .lines()
            .take_while(|line| !line.starts_with("time:"))
            .filter(|line| line.starts_with("instance:"))
            .map(|line| instance_line(line.trim()))
            .collect()
    }

    fn instance_line(line: &str) -> Result<Instance> {
        let bad = |what: &str| Error::Parse(format!("{} in instance line: {}", what, line));
        let fields: Vec<&str> = line.split(';').collect();
        let instance_id = fields[0]
            .trim_start_matches("instance:")
            .parse()
            .map_err(|_| bad("bad id"))?;
        let wordnet_id = first_token(&fields, 1).ok_or_else(|| bad("missing wordnet id"))?;
        let english = first_token(&fields, 2)
            .ok_or_else(|| bad("missing english name"))?
            .split('.')
            .next()
            .unwrap_or("")
            .to_lowercase();
        let kind = match fields.as_slice() {
            [_, _, _, hash] if hash.is_empty() => InstanceKind::Layout,
            [_, _, _, hash] => InstanceKind::Random {
                shapenet_hash: hash.to_string(),
            },
            [_, _, _, position, radius, power] => InstanceKind::Light(LightInfo {
                position: Point3::from(vec3_field("position", position).map_err(|_| bad("bad position"))?),
                power: vec3_field("power", power).map_err(|_| bad("bad power"))?,
                shape: LightShape::Sphere {
                    radius: scalar_field("radius", radius).map_err(|_| bad("bad radius"))?,
                },
            }),
            [_, _, _, position, v1, v2, power] => InstanceKind::Light(LightInfo {
                position: Point3::from(vec3_field("position", position).map_err(|_| bad("bad position"))?),
                power: vec3_field("power", power).map_err(|_| bad("bad power"))?,
                shape: LightShape::Parallelogram {
                    v1: vec3_field("v1", v1).map_err(|_| bad("bad v1"))?,
                    v2: vec3_field("v2", v2).map_err(|_| bad("bad v2"))?,
                },
            }),
            _ => return Err(bad("unexpected number of fields")),
        };
        Ok(Instance {
            instance_id,
            wordnet_id: wordnet_id.to_string(),
            english,
            kind,
        })
    }

    // First comma separated token of a field.
    fn first_token<'a>(fields: &[&'a str], i: usize) -> Option<&'a str> {
        fields.get(i).and_then(|field| field.split(',').next())
    }

    // nom parsers #############################################################

    // Parse a pose: "time:<t> pose:<x>,<y>,<z> lookat:<x>,<y>,<z>".
    fn pose_line(input: &str) -> IResult<&str, Pose> {
        map(
            tuple((
                preceded(tag("time:"), double),
                preceded(tuple((space1, tag("pose:"))), point),
                preceded(tuple((space1, tag("lookat:"))), point),
            )),
            |(timestamp, camera, lookat)| Pose::new(camera, lookat, timestamp),
        )(input)
    }

    // Parse a comma separated point "x,y,z".
    fn point(input: &str) -> IResult<&str, Point3> {
        map(
            tuple((
                terminated(double, char(',')),
                terminated(double, char(',')),
                double,
            )),
            |(x, y, z)| Point3::new(x, y, z),
        )(input)
    }

    // Parse a named list of numbers "name[a,b,...]".
    fn bracketed<'a>(name: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<Float>> {
        preceded(
            tag(name),
            delimited(char('['), separated_list1(char(','), double), char(']')),
        )
    }

    fn vec3_field(name: &str, field: &str) -> std::result::Result<Vec3, ()> {
        match all_consuming(bracketed(name))(field.trim()) {
            Ok((_, values)) if values.len() == 3 => Ok(Vec3::new(values[0], values[1], values[2])),
            _ => Err(()),
        }
    }

    fn scalar_field(name: &str, field: &str) -> std::result::Result<Float, ()> {
        match all_consuming(bracketed(name))(field.trim()) {
            Ok((_, values)) if values.len() == 1 => Ok(values[0]),
            _ => Err(()),
        }
    }
} // pub mod parse

// TESTS #############################################################
