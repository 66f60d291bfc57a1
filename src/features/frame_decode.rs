use crate::error::{Error, Result};
use rxing::common::HybridBinarizer;
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintValue, DecodeHints, Exceptions, Luma8LuminanceSource,
    MultiFormatReader, Reader,
};

/// A barcode found in a camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub kind: String,
    pub data: String,
}

/// Decode the first barcode in a luminance (Y) plane.
///
/// `row_stride` is the byte distance between rows; padded rows are repacked
/// before decoding. Rotation is left to the decoder: the supported formats are
/// found in any orientation.
pub fn decode_luma_frame(
    luma_data: &[u8],
    width: u32,
    height: u32,
    row_stride: u32,
    _rotation_deg: u16,
) -> Result<Option<DecodedCode>> {
    let stride = if row_stride == 0 { width } else { row_stride };
    if width == 0 || height == 0 || stride < width {
        return Err(Error::FrameDimensions {
            width,
            height,
            row_stride,
        });
    }
    let needed = required_len(width as usize, height as usize, stride as usize);
    if luma_data.len() < needed {
        return Err(Error::FrameTooSmall {
            needed,
            actual: luma_data.len(),
        });
    }

    let packed = pack_rows(luma_data, width as usize, height as usize, stride as usize);
    let hints = DecodeHints::default().with(DecodeHintValue::TryHarder(true));

    let source = Luma8LuminanceSource::new(packed, width, height);
    let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
    let mut reader = MultiFormatReader::default();

    match reader.decode_with_hints(&mut bitmap, &hints) {
        Ok(result) => Ok(Some(DecodedCode {
            kind: format_label(result.getBarcodeFormat()),
            data: result.getText().to_string(),
        })),
        Err(Exceptions::NotFoundException(_)) => Ok(None),
        Err(e) => Err(Error::FrameDecode(format!("{e:?}"))),
    }
}

/// Bytes needed for a frame; the last row may omit its padding.
fn required_len(width: usize, height: usize, stride: usize) -> usize {
    stride * (height - 1) + width
}

fn pack_rows(luma: &[u8], width: usize, height: usize, stride: usize) -> Vec<u8> {
    if stride == width {
        return luma[..width * height].to_vec();
    }
    let mut out = Vec::with_capacity(width * height);
    for row in 0..height {
        let start = row * stride;
        out.extend_from_slice(&luma[start..start + width]);
    }
    out
}

/// Label stored as the record type, e.g. `QR_CODE`.
pub fn format_label(format: &BarcodeFormat) -> String {
    match format {
        BarcodeFormat::QR_CODE => "QR_CODE".into(),
        BarcodeFormat::MICRO_QR_CODE => "MICRO_QR_CODE".into(),
        BarcodeFormat::DATA_MATRIX => "DATA_MATRIX".into(),
        BarcodeFormat::AZTEC => "AZTEC".into(),
        BarcodeFormat::PDF_417 => "PDF_417".into(),
        BarcodeFormat::EAN_13 => "EAN_13".into(),
        BarcodeFormat::EAN_8 => "EAN_8".into(),
        BarcodeFormat::UPC_A => "UPC_A".into(),
        BarcodeFormat::UPC_E => "UPC_E".into(),
        BarcodeFormat::CODE_128 => "CODE_128".into(),
        BarcodeFormat::CODE_39 => "CODE_39".into(),
        other => format!("{other:?}"),
    }
}
