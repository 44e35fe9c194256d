use crate::runtime::blueprint::NodeIndex;

/// 系统调用接口
/// Node 通过此接口控制 Engine 的调度
pub trait Syscall: Send + Sync {
    /// Move the token to another node.
    fn jump(&mut self, target: NodeIndex);

    /// Park the token until an external actor completes the task.
    fn wait(&mut self);

    /// The token has reached an end node.
    fn terminate(&mut self);
}
