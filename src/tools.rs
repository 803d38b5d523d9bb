use byteorder::{LittleEndian, WriteBytesExt};
use cgmath::Point2;
use std::fs::File;
use std::io::Write;

use crate::integrators::ImageBlock;

pub fn save(imgout_path_str: &str, img: &ImageBlock) {
    let output_ext = match std::path::Path::new(imgout_path_str).extension() {
        None => panic!("No file extension provided"),
        Some(x) => std::ffi::OsStr::to_str(x).expect("Issue to unpack the file"),
    };
    match output_ext {
        "pfm" => save_pfm(imgout_path_str, img),
        "png" => save_png(imgout_path_str, img),
        _ => panic!("Unknown output file extension"),
    }
}

pub fn save_pfm(imgout_path_str: &str, img: &ImageBlock) {
    let mut file = File::create(std::path::Path::new(imgout_path_str)).unwrap();
    let header = format!("PF\n{} {}\n-1.0\n", img.size.x, img.size.y);
    file.write_all(header.as_bytes()).unwrap();
    for y in 0..img.size.y {
        for x in 0..img.size.x {
            let p = img.get(Point2::new(x, img.size.y - y - 1));
            file.write_f32::<LittleEndian>(p.r.abs()).unwrap();
            file.write_f32::<LittleEndian>(p.g.abs()).unwrap();
            file.write_f32::<LittleEndian>(p.b.abs()).unwrap();
        }
    }
}

pub fn save_png(imgout_path_str: &str, img: &ImageBlock) {
    let mut image_ldr = image::RgbImage::new(img.size.x, img.size.y);
    for x in 0..img.size.x {
        for y in 0..img.size.y {
            let p = img.get(Point2::new(x, y));
            image_ldr.put_pixel(x, y, image::Rgb(p.to_rgb8()));
        }
    }
    image_ldr
        .save(imgout_path_str)
        .expect("failed to write img into file");
}
