//! 규칙 기반 응답기
//!
//! 인텐트별 고정 템플릿으로 즉시 답변합니다.
//! LLM 경로가 실패하거나 비활성화된 경우의 폴백이기도 합니다.

use crate::intent::ClassificationResult;

// ============================================================================
// RuleResponder Trait
// ============================================================================

/// 규칙 기반 응답 트레이트
pub trait RuleResponder: Send + Sync {
    /// 분류 결과에 맞는 답변 생성
    fn respond(&self, query: &str, classification: &ClassificationResult) -> String;

    /// 응답기 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// CannedResponder
// ============================================================================

const GREETING_REPLY: &str = "Hello! I'm your technician support assistant. \
Ask me about equipment troubleshooting, maintenance planning, or safety procedures.";

const GOODBYE_REPLY: &str = "Goodbye! Stay safe, and remember to follow lockout/tagout \
procedures before working on any equipment.";

const HELP_REPLY: &str = "I can help with:\n\
- Troubleshooting motors, pumps and other equipment\n\
- Safety procedures (lockout/tagout, PPE, hazards)\n\
- Maintenance schedules and inspections\n\
- Explanations of how equipment works\n\
Describe the problem and the equipment involved.";

const MOTOR_REPLY: &str = "Motor troubleshooting checklist:\n\
1. Verify the power supply and check for tripped breakers.\n\
2. Inspect connections for looseness or corrosion.\n\
3. Test the overload relays.\n\
4. Check for mechanical binding in the load.\n\
Lock out the motor before inspecting it.";

const PUMP_REPLY: &str = "Pump troubleshooting checklist:\n\
1. Check the suction line for blockages or air leaks.\n\
2. Verify the pump is primed.\n\
3. Inspect the impeller for wear or debris.\n\
4. Check the seals for leaks.\n\
Isolate and lock out the pump before opening it.";

const TROUBLESHOOTING_REPLY: &str = "General troubleshooting steps:\n\
1. Confirm the equipment has power and controls are set correctly.\n\
2. Look for visible damage, leaks, or unusual noise.\n\
3. Check recent maintenance records.\n\
4. Isolate the fault to one subsystem before replacing parts.\n\
Tell me which equipment is affected for more specific guidance.";

const SAFETY_REPLY: &str = "Safety first:\n\
- Apply lockout/tagout (LOTO) before servicing equipment.\n\
- Wear the PPE required for the task (gloves, eye protection, hearing protection).\n\
- Verify zero energy state before starting work.\n\
- Know the location of emergency stops and follow emergency protocols.";

const MAINTENANCE_REPLY: &str = "Preventive maintenance tips:\n\
- Follow the manufacturer's service intervals.\n\
- Schedule routine inspections and keep records.\n\
- Replace filters, lubricate bearings and check belts regularly.";

const EQUIPMENT_REPLY: &str = "For equipment-specific issues, please tell me the \
equipment type, model, and the symptoms you are seeing so I can point you to the \
right procedure.";

const EXPLANATION_REPLY: &str = "I can explain how equipment works. Please name the \
component or principle you want to understand in more detail.";

const UNCLEAR_REPLY: &str = "I'm not sure I understood. Could you describe the \
equipment and the problem in more detail? Type 'help' to see what I can do.";

/// 인텐트별 고정 템플릿 응답기
#[derive(Debug, Default, Clone)]
pub struct CannedResponder;

impl CannedResponder {
    pub fn new() -> Self {
        Self
    }
}

impl RuleResponder for CannedResponder {
    fn respond(&self, query: &str, classification: &ClassificationResult) -> String {
        let query_lower = query.to_lowercase();

        let reply = match classification.intent.as_str() {
            "greeting" => GREETING_REPLY,
            "goodbye" => GOODBYE_REPLY,
            "help" => HELP_REPLY,
            "simple_troubleshooting" => {
                if query_lower.contains("motor") {
                    MOTOR_REPLY
                } else if query_lower.contains("pump") {
                    PUMP_REPLY
                } else {
                    TROUBLESHOOTING_REPLY
                }
            }
            "safety_query" => SAFETY_REPLY,
            "maintenance_planning" => MAINTENANCE_REPLY,
            "equipment_specific" => EQUIPMENT_REPLY,
            "technical_explanation" => EXPLANATION_REPLY,
            _ => UNCLEAR_REPLY,
        };

        reply.to_string()
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Route;

    fn result(intent: &str) -> ClassificationResult {
        ClassificationResult {
            intent: intent.to_string(),
            confidence: 0.6,
            route: Route::RuleBased,
        }
    }

    #[test]
    fn test_troubleshooting_uses_equipment_hint() {
        let responder = CannedResponder::new();
        let motor = responder.respond("My MOTOR stopped", &result("simple_troubleshooting"));
        assert!(motor.starts_with("Motor troubleshooting"));

        let pump = responder.respond("pump is broken", &result("simple_troubleshooting"));
        assert!(pump.starts_with("Pump troubleshooting"));

        let other = responder.respond("it is broken", &result("simple_troubleshooting"));
        assert!(other.starts_with("General troubleshooting"));
    }

    #[test]
    fn test_unknown_intent_gets_unclear_reply() {
        let responder = CannedResponder::new();
        let reply = responder.respond("???", &result("something_new"));
        assert_eq!(reply, UNCLEAR_REPLY);
        assert_eq!(
            responder.respond("huh", &ClassificationResult::unclear()),
            UNCLEAR_REPLY
        );
    }

    #[test]
    fn test_safety_reply_mentions_loto() {
        let reply = CannedResponder::new().respond("loto?", &result("safety_query"));
        assert!(reply.contains("lockout/tagout"));
    }
}
