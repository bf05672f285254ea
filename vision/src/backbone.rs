use anyhow::{Result, anyhow};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Func, VarBuilder};
use candle_transformers::models::resnet;
use hf_hub::{Repo, RepoType, api::sync::Api};
use image::RgbImage;
use std::path::Path;

pub const DEFAULT_MODEL_REPO: &str = "lmz/candle-resnet";
const WEIGHTS_FILE: &str = "resnet18.safetensors";
pub const IMAGE_SIZE: usize = 224;

// ImageNet statistics the ResNet-18 weights were trained with
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// ResNet-18 convolutional backbone without its classifier head.
/// Forward pass yields the 512-d globally average pooled embedding.
pub struct Backbone {
    model: Func<'static>,
    device: Device,
}

impl Backbone {
    /// Fetch weights from the hf-hub repo (cached locally after first run)
    pub fn new(repo_id: &str) -> Result<Self> {
        let api = Api::new()?;
        let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));
        let weights = repo.get(WEIGHTS_FILE)?;

        Self::from_weights(&weights)
    }

    pub fn from_weights(weights: &Path) -> Result<Self> {
        #[cfg(feature = "metal")]
        let device = Device::new_metal(0).unwrap_or(Device::Cpu);
        #[cfg(all(feature = "cuda", not(feature = "metal")))]
        let device = Device::new_cuda(0).unwrap_or(Device::Cpu);
        #[cfg(not(any(feature = "metal", feature = "cuda")))]
        let device = Device::Cpu;

        log::info!("Loading ResNet-18 backbone from {:?} on {:?}", weights, device);

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = resnet::resnet18_no_final_layer(vb)?;

        log::info!("Backbone loaded successfully");

        Ok(Self { model, device })
    }

    /// Pooled embedding for one image
    pub fn embed(&self, image: &RgbImage) -> Result<Vec<f32>> {
        let data = normalize(&scale(image));
        let input = Tensor::from_vec(data, (1, 3, IMAGE_SIZE, IMAGE_SIZE), &self.device)?;

        let pooled = self.model.forward(&input)?;
        let embedding: Vec<f32> = pooled.flatten_all()?.to_vec1()?;
        if embedding.is_empty() {
            return Err(anyhow!("Backbone returned an empty embedding"));
        }

        Ok(embedding)
    }

    /// Euclidean norm of the pooled embedding
    pub fn energy(&self, image: &RgbImage) -> Result<f32> {
        Ok(l2_norm(&self.embed(image)?))
    }
}

/// Scale image to model input size (224x224 RGB)
pub fn scale(image: &RgbImage) -> RgbImage {
    image::imageops::resize(
        image,
        IMAGE_SIZE as u32,
        IMAGE_SIZE as u32,
        image::imageops::FilterType::Triangle,
    )
}

/// CHW float layout, scaled to [0, 1] then standardized per channel
pub fn normalize(scaled_rgb: &RgbImage) -> Vec<f32> {
    let plane = (scaled_rgb.width() * scaled_rgb.height()) as usize;
    let mut data = vec![0f32; 3 * plane];

    for (i, pixel) in scaled_rgb.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            data[c * plane + i] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    data
}

pub fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_scale_produces_model_input_size() {
        let image = RgbImage::from_pixel(640, 480, Rgb([10, 20, 30]));
        let scaled = scale(&image);
        assert_eq!(scaled.dimensions(), (IMAGE_SIZE as u32, IMAGE_SIZE as u32));
        assert_eq!(scaled.get_pixel(100, 100).0, [10, 20, 30]);
    }

    #[test]
    fn test_normalize_uses_chw_layout() {
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 128]));
        let data = normalize(&image);
        assert_eq!(data.len(), 3 * 16);

        let red = (1.0 - 0.485) / 0.229;
        let green = (0.0 - 0.456) / 0.224;
        let blue = (128.0 / 255.0 - 0.406) / 0.225;
        assert!(data[..16].iter().all(|v| (v - red).abs() < 1e-5));
        assert!(data[16..32].iter().all(|v| (v - green).abs() < 1e-5));
        assert!(data[32..].iter().all(|v| (v - blue).abs() < 1e-5));
    }

    fn zero_weight_backbone() -> Backbone {
        let device = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &device);
        let model = resnet::resnet18_no_final_layer(vb).unwrap();
        Backbone { model, device }
    }

    #[test]
    fn test_forward_pass_yields_pooled_embedding() {
        let backbone = zero_weight_backbone();
        let image = RgbImage::from_pixel(300, 200, Rgb([73, 109, 137]));

        let embedding = backbone.embed(&image).unwrap();
        assert_eq!(embedding.len(), 512);

        let energy = backbone.energy(&image).unwrap();
        assert!(energy.is_finite());
        assert!(energy >= 0.0);
    }

    #[test]
    fn test_l2_norm() {
        assert_eq!(l2_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(l2_norm(&[]), 0.0);
    }
}
