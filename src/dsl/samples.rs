//! Reference process definitions.
//!
//! Both are review loops: each gateway either sends the token back to the
//! previous task (`pass == '2'`) or forwards it (`pass == '1'`). Neither
//! gateway declares a default edge, so an unset or unexpected `pass` value
//! terminates the instance.

use crate::dsl::Definition;
use crate::dsl::builder::DefinitionBuilder;

const REJECT: &str = "${pass=='2'}";
const APPROVE: &str = "${pass=='1'}";

/// Four-stage approval chain (`process01`).
pub fn approval_chain() -> Definition {
    DefinitionBuilder::new("process01")
        .name("Approval chain")
        .start("startEvent")
        .user_task("task1", "Stage 1", ["candidateGroup1"])
        .gateway("gateway1")
        .user_task("task2", "Stage 2", ["candidateGroup2"])
        .gateway("gateway2")
        .user_task("task3", "Stage 3", ["candidateGroup3"])
        .gateway("gateway3")
        .user_task("task4", "Stage 4", ["candidateGroup4"])
        .end("endEvent")
        .connect("startEvent", "task1")
        .connect("task1", "task2")
        .connect("task2", "gateway1")
        .connect_if("gateway1", "task1", "rejected", REJECT)
        .connect_if("gateway1", "task3", "approved", APPROVE)
        .connect("task3", "gateway2")
        .connect_if("gateway2", "task2", "rejected", REJECT)
        .connect_if("gateway2", "task4", "approved", APPROVE)
        .connect("task4", "gateway3")
        .connect_if("gateway3", "task3", "rejected", REJECT)
        .connect_if("gateway3", "endEvent", "approved", APPROVE)
        .build()
}

/// Single review with an optional second sign-off (`process02`).
pub fn simple_review() -> Definition {
    DefinitionBuilder::new("process02")
        .name("Simple review")
        .start("startEvent")
        .user_task("task1", "Review", ["candidateGroup1"])
        .gateway("gateway1")
        .user_task("task2", "Sign-off", ["candidateGroup2"])
        .end("endEvent")
        .connect("startEvent", "task1")
        .connect("task1", "gateway1")
        .connect_if("gateway1", "task2", "approved", APPROVE)
        .connect_if("gateway1", "endEvent", "rejected", REJECT)
        .connect_if("task2", "endEvent", "approved", APPROVE)
        .build()
}
