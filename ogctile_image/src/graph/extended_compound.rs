//! Composites a bottom-to-top list of sub-images within a common bbox, alpha-blending
//! where the pyramid allows transparency and falling back to nodata elsewhere.

use super::ImageNode;
use ogctile_core::bbox::BoundingBox;

pub struct Layer {
	pub node: Box<dyn ImageNode>,
	/// Pixel offset of this sub-image's top-left corner within the compound.
	pub offset_x: i64,
	pub offset_y: i64,
}

pub struct ExtendedCompound {
	width: u32,
	height: u32,
	channels: u8,
	bbox: BoundingBox<f64>,
	layers: Vec<Layer>,
	nodata: Vec<f32>,
	transparent: bool,
}

impl ExtendedCompound {
	#[must_use]
	pub fn new(width: u32, height: u32, channels: u8, bbox: BoundingBox<f64>, layers: Vec<Layer>, nodata_values: &[f64], transparent: bool) -> Self {
		let nodata = (0..channels as usize).map(|i| *nodata_values.get(i).unwrap_or(&0.0) as f32 / 255.0).collect();
		ExtendedCompound { width, height, channels, bbox, layers, nodata, transparent }
	}

	/// Alpha-multiplicative composition with `bg=1` (fully covering) when the underlying
	/// sample is opaque — the §9 Open Question resolution.
	fn blend(&self, below: &[f32], above: &[f32]) -> Vec<f32> {
		let c = self.channels as usize;
		if !self.transparent || c < 4 {
			return above.to_vec();
		}
		let alpha = above[c - 1];
		if alpha >= 0.999 {
			return above.to_vec();
		}
		let mut out = vec![0f32; c];
		for i in 0..c - 1 {
			out[i] = above[i] * alpha + below[i] * (1.0 - alpha);
		}
		out[c - 1] = alpha + below[c - 1] * (1.0 - alpha);
		out
	}
}

impl ImageNode for ExtendedCompound {
	fn width(&self) -> u32 {
		self.width
	}

	fn height(&self) -> u32 {
		self.height
	}

	fn channels(&self) -> u8 {
		self.channels
	}

	fn bbox(&self) -> BoundingBox<f64> {
		self.bbox
	}

	fn getline(&self, buf: &mut [f32], y: u32) -> usize {
		let c = self.channels as usize;
		for x_idx in 0..self.width as usize {
			buf[x_idx * c..(x_idx + 1) * c].copy_from_slice(&self.nodata);
		}

		for layer in &self.layers {
			let layer_y = y as i64 - layer.offset_y;
			if layer_y < 0 || layer_y >= i64::from(layer.node.height()) {
				continue;
			}
			let mut line = vec![0f32; layer.node.line_len()];
			layer.node.getline(&mut line, layer_y as u32);

			for lx in 0..layer.node.width() as i64 {
				let dst_x = lx + layer.offset_x;
				if dst_x < 0 || dst_x >= i64::from(self.width) {
					continue;
				}
				let src = &line[lx as usize * c..(lx as usize + 1) * c];
				let dst_off = dst_x as usize * c;
				let blended = self.blend(&buf[dst_off..dst_off + c], src);
				buf[dst_off..dst_off + c].copy_from_slice(&blended);
			}
		}
		self.width as usize * c
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::TileImage;
	use crate::raster::Raster;

	#[test]
	fn uncovered_regions_fall_back_to_nodata() {
		let compound = ExtendedCompound::new(4, 4, 3, BoundingBox::new(0.0, 0.0, 4.0, 4.0), vec![], &[9.0, 9.0, 9.0], false);
		let mut buf = vec![0f32; 12];
		compound.getline(&mut buf, 0);
		assert!((buf[0] - 9.0 / 255.0).abs() < 1e-6);
	}

	#[test]
	fn top_layer_overrides_covered_pixels() {
		let raster = Raster::new(2, 2, 3, &[255, 0, 0]);
		let tile = TileImage::whole(raster, BoundingBox::new(0.0, 0.0, 2.0, 2.0));
		let layer = Layer { node: Box::new(tile), offset_x: 1, offset_y: 1 };
		let compound = ExtendedCompound::new(4, 4, 3, BoundingBox::new(0.0, 0.0, 4.0, 4.0), vec![layer], &[0.0, 0.0, 0.0], false);
		let mut buf = vec![0f32; 12];
		compound.getline(&mut buf, 1);
		assert!((buf[1 * 3] - 1.0).abs() < 1e-6);
	}
}
