// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use argh::FromArgs;
use log::info;
use std::{error::Error, fs, path::PathBuf};

use scenenet_rgbd::core::{camera::Intrinsics, normals};
use scenenet_rgbd::dataset::scenenet;
use scenenet_rgbd::misc::view;

/// Estimate the surface normals of every view of a SceneNet RGB-D trajectory
/// and save them as RGB images.
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

    /// distance in pixels between a pixel and its neighbors
    #[argh(option, default = "2")]
    offset: usize,

    /// depth in meters given to pixels without depth
    #[argh(option, default = "scenenet::NORMALS_MISSING_DEPTH")]
    missing_depth: f64,

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

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let intrinsics = Intrinsics {
        horizontal_fov: args.hfov,
        vertical_fov: args.vfov,
        width: args.width,
        height: args.height,
    };
    let config = normals::Config {
        offset: args.offset,
        missing_depth: args.missing_depth,
    };
    let traj = scenenet::read_trajectory(&args.render_path, &args.log_file, args.frame_skip)?;
    let rays = intrinsics.ray_table();
    fs::create_dir_all(&args.out_dir)?;

    for (idx, view) in traj.views.iter().enumerate() {
        let depth_map = scenenet::read_depth_map(traj.depth_path(&args.data_root, view))?;
        let normals = config.from_depth(&depth_map, &rays)?;
        let out_path = args.out_dir.join(format!("surface_normals_{}.png", idx));
        view::normals_image(&normals).save(&out_path)?;
        info!("frame {} -> {}", view.frame_num, out_path.display());
    }

    Ok(())
}
