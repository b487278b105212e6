//! A node that always returns the layer's nodata value; used when a request's bbox lies
//! entirely outside all pyramid data.

use super::ImageNode;
use ogctile_core::bbox::BoundingBox;

pub struct Empty {
	width: u32,
	height: u32,
	channels: u8,
	bbox: BoundingBox<f64>,
	nodata: Vec<f32>,
}

impl Empty {
	#[must_use]
	pub fn new(width: u32, height: u32, channels: u8, bbox: BoundingBox<f64>, nodata_values: &[f64]) -> Self {
		let nodata = (0..channels as usize)
			.map(|i| *nodata_values.get(i).unwrap_or(&0.0) as f32 / 255.0)
			.collect();
		Empty { width, height, channels, bbox, nodata }
	}
}

impl ImageNode for Empty {
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

	fn getline(&self, buf: &mut [f32], _y: u32) -> usize {
		for (i, sample) in buf.iter_mut().enumerate() {
			*sample = self.nodata[i % self.nodata.len()];
		}
		buf.len()
	}
}
