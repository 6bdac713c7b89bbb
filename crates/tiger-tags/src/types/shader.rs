use crate::graph::ResolveContext;
use crate::types::SHADER_BYTECODE_TYPE;
use crate::{Result, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use tiger_formats::{Record, Schema};

const HEADER: Schema = Schema::new("ShaderBytecode", &[]);

/// Compiled shader; the entry bytes are the byte-code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBytecode {
    pub data: Bytes,
}

impl ShaderBytecode {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl Tag for ShaderBytecode {
    const NAME: &'static str = "ShaderBytecode";
    const TYPE_TAG: u32 = SHADER_BYTECODE_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(_record: Record, bytes: Bytes, _ctx: &ResolveContext<'_>) -> Result<Self> {
        Ok(Self { data: bytes })
    }
}
