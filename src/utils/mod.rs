/// Useful enumerations for the kinds of reconstructed candidates.
pub mod enums;
/// Stateless kinematic functions (angular separations, transverse mass, momentum sums).
pub mod kinematics;
/// Three- and four-vectors with collider-style accessors.
pub mod vectors;
