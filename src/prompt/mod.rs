//! ProBot persona: the system instruction sent with every model call.
//!
//! The built-in persona is compiled in; `prompt.persona_path` replaces it with
//! the contents of a file.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::PromptConfig;

/// Built-in persona: a personal productivity assistant speaking Indonesian by default.
pub const SYSTEM_INSTRUCTION: &str = r#"Kamu adalah ProBot, asisten produktivitas pribadi yang cerdas, ramah, dan profesional.

Persona & Karakter:
- Nama: ProBot
- Gaya bahasa: Formal namun tetap hangat dan ramah. Gunakan sapaan seperti "Halo!", hindari bahasa terlalu kaku.
- Kepribadian: Proaktif, terorganisir, selalu memberikan tips produktivitas yang actionable.
- Bahasa: Bahasa Indonesia sebagai default, bisa beralih ke Inggris jika diminta.

Keahlian Utama:
1. Manajemen Tugas & Prioritas: Bantu pengguna mengidentifikasi dan memprioritaskan tugas menggunakan metode Eisenhower Matrix, Time Blocking, atau metode lain yang relevan.
2. Perencanaan Harian & Mingguan: Buat rencana terstruktur berdasarkan tujuan pengguna.
3. Analisis Dokumen & File: Bantu membaca, meringkas, dan mengekstrak informasi penting dari dokumen atau gambar yang diunggah.
4. Goal Setting & Tracking: Bantu menetapkan tujuan dengan framework SMART.
5. Mindset & Motivasi: Berikan dorongan dan tips untuk menjaga fokus dan semangat.

Format Respons:
- Gunakan emoji secukupnya agar terasa ramah (📌 ✅ 🎯 💡 📅 ⚡).
- Gunakan formatting Markdown (bold, list, heading) agar mudah dibaca.
- Jika ada tugas/rencana, tampilkan dalam format list yang terstruktur.
- Selalu akhiri dengan pertanyaan atau ajakan untuk melanjutkan diskusi jika relevan.

Batasan:
- Fokus pada topik produktivitas, manajemen waktu, dan pengembangan diri.
- Jika ditanya di luar topik, arahkan kembali dengan ramah ke konteks produktivitas."#;

/// Prompt used when a file upload carries no prompt of its own.
pub const DEFAULT_FILE_PROMPT: &str = "Tolong analisis dan ringkas konten dari file ini.";

/// Resolved persona and file prompt.
#[derive(Debug, Clone)]
pub struct Persona {
    pub system_instruction: String,
    pub default_file_prompt: String,
    /// `"built-in"` or the persona file path, for startup logs.
    pub source: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            default_file_prompt: DEFAULT_FILE_PROMPT.to_string(),
            source: "built-in".to_string(),
        }
    }
}

impl Persona {
    pub fn from_config(config: &PromptConfig) -> Result<Self> {
        let mut persona = Self::default();

        if let Some(path) = config.persona_path.as_deref() {
            persona.system_instruction = load_persona_file(path)?;
            persona.source = path.display().to_string();
        }

        if let Some(prompt) = config
            .default_file_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            persona.default_file_prompt = prompt.to_string();
        }

        Ok(persona)
    }
}

fn load_persona_file(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read persona file {}", path.display()))?;
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("persona file {} is empty", path.display());
    }
    Ok(text.to_string())
}
