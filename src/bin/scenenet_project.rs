// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use argh::FromArgs;
use log::{info, warn};
use std::{error::Error, fs, path::PathBuf};

use scenenet_rgbd::core::camera::Intrinsics;
use scenenet_rgbd::dataset::scenenet;
use scenenet_rgbd::misc::type_aliases::Point3;
use scenenet_rgbd::misc::{interop, view};

/// Project a world point, by default the first light of the scene,
/// into every view of a SceneNet RGB-D trajectory
/// and mark it with a black cross on the photos.
#[derive(Debug, FromArgs)]
struct Args {
    /// root directory of the dataset renders
    #[argh(positional)]
    data_root: PathBuf,

    /// render path of the trajectory, relative to the data root (e.g. 0/68)
    #[argh(positional)]
    render_path: String,

    /// render log of the trajectory
    #[argh(positional)]
    log_file: PathBuf,

    /// output directory
    #[argh(positional)]
    out_dir: PathBuf,

    /// world point to project, as "x,y,z"
    #[argh(option, from_str_fn(parse_point))]
    point: Option<Point3>,

    /// instance id of the light to project, if no point is given
    #[argh(option)]
    light: Option<u32>,

    /// only one shutter interval out of frame_skip was rendered
    #[argh(option, default = "scenenet::FRAME_SKIP")]
    frame_skip: usize,

    /// image width in pixels
    #[argh(option, default = "scenenet::INTRINSICS.width")]
    width: usize,

    /// image height in pixels
    #[argh(option, default = "scenenet::INTRINSICS.height")]
    height: usize,

    /// horizontal field of view in degrees
    #[argh(option, default = "scenenet::INTRINSICS.horizontal_fov")]
    hfov: f64,

    /// vertical field of view in degrees
    #[argh(option, default = "scenenet::INTRINSICS.vertical_fov")]
    vfov: f64,
}

fn parse_point(value: &str) -> Result<Point3, String> {
    let coords = value
        .split(',')
        .map(|c| c.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    match coords.as_slice() {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(format!("expected 3 coordinates, got {}", coords.len())),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let intrinsics = Intrinsics {
        horizontal_fov: args.hfov,
        vertical_fov: args.vfov,
        width: args.width,
        height: args.height,
    };
    let traj = scenenet::read_trajectory(&args.render_path, &args.log_file, args.frame_skip)?;
    let point = match (args.point, args.light) {
        (Some(point), _) => point,
        (None, Some(id)) => {
            traj.lights()
                .find(|(light_id, _)| *light_id == id)
                .ok_or_else(|| format!("no light with instance id {}", id))?
                .1
                .position
        }
        (None, None) => {
            traj.lights()
                .next()
                .ok_or("the scene has no light, use --point")?
                .1
                .position
        }
    };
    info!("projecting {:?}", point);
    fs::create_dir_all(&args.out_dir)?;

    for (idx, view) in traj.views.iter().enumerate() {
        let pose = view.shutter.interpolate(scenenet::RENDER_ALPHA)?;
        let photo = image::open(traj.photo_path(&args.data_root, view))?.to_rgb8();
        let mut pixels = interop::matrix_from_rgb(&photo);
        let visible = intrinsics
            .project_world(&pose, &point)
            .map_or(false, |uv| view::mark_cross(&mut pixels, &uv));
        if !visible {
            warn!("frame {}: point not visible", view.frame_num);
        }
        let out_path = args.out_dir.join(format!("{}_marking_point.png", idx));
        interop::rgb_from_matrix(&pixels).save(&out_path)?;
    }

    Ok(())
}
