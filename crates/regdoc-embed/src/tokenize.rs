use std::path::Path;

use candle_core::{Device, Tensor};
use tokenizers::{Encoding, Tokenizer, TruncationParams};

use regdoc_core::error::{Error, Result};

/// Model inputs for one batch, padded to the longest encoding.
pub struct EncodedBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

/// Load `tokenizer.json` from `model_dir`, truncating every input to `max_len` tokens.
pub fn load_tokenizer(model_dir: &Path, max_len: usize, err: fn(String) -> Error) -> Result<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    if !path.is_file() {
        return Err(Error::Config(format!("tokenizer not found: {}", path.display())));
    }
    let mut tokenizer = Tokenizer::from_file(&path).map_err(|e| err(format!("{}: {e}", path.display())))?;
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| err(e.to_string()))?;
    Ok(tokenizer)
}

/// Stack encodings into `[batch, seq]` tensors, right-padding with `pad_id`
/// and a zero attention mask.
pub fn batch_to_tensors(encodings: &[Encoding], pad_id: u32, device: &Device) -> candle_core::Result<EncodedBatch> {
    let batch = encodings.len();
    let seq = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(batch * seq);
    let mut mask = Vec::with_capacity(batch * seq);
    let mut types = Vec::with_capacity(batch * seq);
    for enc in encodings {
        let n = enc.get_ids().len();
        ids.extend_from_slice(enc.get_ids());
        mask.extend_from_slice(enc.get_attention_mask());
        types.extend_from_slice(enc.get_type_ids());
        ids.extend(std::iter::repeat(pad_id).take(seq - n));
        mask.extend(std::iter::repeat(0u32).take(seq - n));
        types.extend(std::iter::repeat(0u32).take(seq - n));
    }
    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, (batch, seq), device)?,
        attention_mask: Tensor::from_vec(mask, (batch, seq), device)?,
        token_type_ids: Tensor::from_vec(types, (batch, seq), device)?,
    })
}
