// Prompt constants for the two review stages.

/// System prompt for the L1 screener.
pub const L1_SYSTEM: &str = "You are Riva, an L1 recruitment screener. \
    You compare a candidate's resume and first-round interview against a job description. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// L1 prompt template. Placeholders: `{role}`, `{candidate_name}`, `{jd}`, `{resume}`,
/// `{transcript}`, `{feedback}`, `{memory_context}` and the band edges
/// `{move_min}` / `{reject_max}` in score points.
pub const L1_PROMPT_TEMPLATE: &str = r#"Evaluate {candidate_name} for the {role} role.

### JOB DESCRIPTION
{jd}

### RESUME
{resume}

### L1 INTERVIEW TRANSCRIPT
{transcript}

### INTERVIEWER FEEDBACK
{feedback}
{memory_context}
Return a JSON object with this EXACT schema:
{
  "match_summary": "2-3 sentences on overall fit",
  "strengths": ["..."],
  "concerns": ["..."],
  "behavioral_signals": ["..."],
  "communication_signals": ["..."],
  "red_flags": ["..."],
  "risk_flags": ["..."],
  "compensation_alignment": "aligned | above_band | below_band | unknown",
  "joining_feasibility": "immediate | notice_period | unclear",
  "fit_score": 0,
  "final_decision": "MOVE | HOLD | REJECT"
}

Scoring bands for fit_score (0-100):
- MOVE: {move_min}-100, clear evidence for the core requirements
- HOLD: above {reject_max} and below {move_min}, mixed or ambiguous evidence
- REJECT: 0-{reject_max}, core requirements missing

Rules:
- Ground every strength and concern in the documents above.
- Use red_flags for eligibility problems. Write "hard_block" when a mandatory criterion fails.
- Write "data_incomplete" in red_flags when a document is unreadable or empty.
"#;

pub const L2_SYSTEM: &str = "You are Arjun, an L2 hiring panelist. \
    You assess depth, leadership and communication from a second-round interview. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// L2 prompt template. Replace `{role}`, `{candidate_name}`, `{jd}`, `{resume}`,
/// `{transcript}`, `{l1_summary}` and `{memory_context}` before sending.
pub const L2_PROMPT_TEMPLATE: &str = r#"Run an L2 deep-dive on {candidate_name} for the {role} role.

### JOB DESCRIPTION
{jd}

### RESUME
{resume}

### L2 INTERVIEW TRANSCRIPT
{transcript}

### L1 OUTCOME
{l1_summary}
{memory_context}
Return a JSON object with this EXACT schema:
{
  "leadership_assessment": "high | medium | low | n/a, with one line of evidence",
  "technical_capability": "...",
  "communication_depth": "excellent | good | poor, with one line of evidence",
  "culture_alignment": "...",
  "career_potential": "...",
  "strengths": ["..."],
  "concerns": ["..."],
  "risk_flags": ["..."],
  "final_score": 0,
  "final_recommendation": "HIRE | HOLD | REJECT",
  "l2_summary": "3-4 sentences for the hiring manager",
  "rationale": "why this recommendation"
}

Rules:
- final_score is 0-100.
- Use risk_flags for integrity concerns. Write "integrity_violation" when the transcript shows dishonesty.
- Write "missing_info" in risk_flags when the transcript is too short to judge.
"#;

/// Heading that introduces stored context for a returning candidate or role.
pub const MEMORY_CONTEXT_HEADING: &str = "### TALENT MEMORY CONTEXT";
